//! Per-wallet executor.
//!
//! A [`WalletExecutor`] owns every component acting for one wallet: its
//! transaction builder, balance service, quote engine and the two workflows.
//! It resolves plan steps against the token registry and runs them in order.
//! Wallets share nothing mutable, so several executors can run concurrently.

use crate::balance::{BalanceError, BalanceService, WalletReport};
use crate::error::{OperationError, OperationOutcome};
use crate::multicall::MulticallBatcher;
use crate::quote::QuoteEngine;
use crate::workflows::{LiquidityRequest, LiquidityWorkflow, SwapRequest, SwapWorkflow};
use dex_account::AccountService;
use dex_config::{Config, PauseRange, PlanStep};
use dex_delivery::{BuilderConfig, ChainClient, FeeConfig, TransactionBuilder};
use dex_types::{truncate_id, Address, TokenRegistry, U256};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Fee parameters from the configuration.
pub fn fee_config(config: &Config) -> FeeConfig {
	FeeConfig {
		eip1559: config.network.eip1559,
		history_blocks: config.delivery.fee_history_blocks,
		reward_percentile: config.delivery.priority_fee_percentile,
		legacy_multiplier_percent: config.delivery.legacy_gas_price_multiplier_percent,
	}
}

/// Transaction builder parameters from the configuration.
pub fn builder_config(config: &Config) -> BuilderConfig {
	BuilderConfig {
		receipt_timeout: Duration::from_secs(config.delivery.receipt_timeout_seconds),
		poll_interval: Duration::from_millis(config.delivery.poll_interval_ms),
		explorer_url: config.network.explorer_url.clone(),
	}
}

/// Result of one plan step.
#[derive(Debug)]
pub struct StepReport {
	pub index: usize,
	pub result: Result<OperationOutcome, OperationError>,
}

/// Results of a wallet's plan, in step order.
#[derive(Debug)]
pub struct PlanReport {
	pub address: Address,
	pub steps: Vec<StepReport>,
	/// A fatal error stopped the plan before its last step.
	pub aborted: bool,
}

impl PlanReport {
	/// Number of steps whose transaction was mined successfully.
	pub fn confirmed(&self) -> usize {
		self.steps
			.iter()
			.filter(|step| matches!(&step.result, Ok(outcome) if outcome.is_confirmed()))
			.count()
	}
}

/// Runs operations for a single wallet.
pub struct WalletExecutor {
	builder: Arc<TransactionBuilder>,
	balances: Arc<BalanceService>,
	quotes: Arc<QuoteEngine>,
	swaps: SwapWorkflow,
	liquidity: LiquidityWorkflow,
	registry: Arc<TokenRegistry>,
	pause: PauseRange,
}

impl WalletExecutor {
	/// Wires up the components for `account` on top of `client`.
	///
	/// # Arguments
	///
	/// * `config` - Validated configuration; contracts, trading and delivery
	///   sections are read from it
	/// * `registry` - Token registry built from the same configuration
	/// * `client` - Chain client for this wallet, possibly behind its proxy
	/// * `account` - Signing account of the wallet
	pub fn new(
		config: &Config,
		registry: Arc<TokenRegistry>,
		client: Arc<dyn ChainClient>,
		account: Arc<AccountService>,
	) -> Self {
		let builder = Arc::new(TransactionBuilder::new(
			client.clone(),
			account,
			fee_config(config),
			builder_config(config),
		));
		let multicall = MulticallBatcher::new(client.clone(), config.contracts.multicall);
		let balances = Arc::new(BalanceService::new(
			builder.clone(),
			multicall.clone(),
			config.contracts.wrapped_native,
		));
		let quotes = Arc::new(QuoteEngine::new(
			client,
			multicall,
			config.contracts.router,
			config.contracts.factory,
			config.trading.slippage_bps,
		));

		let swaps = SwapWorkflow::new(
			builder.clone(),
			balances.clone(),
			quotes.clone(),
			config.trading.swap_deadline_seconds,
		);
		let liquidity = LiquidityWorkflow::new(
			builder.clone(),
			balances.clone(),
			quotes.clone(),
			config.trading.liquidity_deadline_seconds,
		);

		Self {
			builder,
			balances,
			quotes,
			swaps,
			liquidity,
			registry,
			pause: config.trading.pause_seconds,
		}
	}

	pub fn address(&self) -> Address {
		self.builder.address()
	}

	/// Swaps `percent_bps` of the `from` balance into `to`.
	pub async fn swap(
		&self,
		from: &str,
		to: &str,
		percent_bps: u16,
	) -> Result<OperationOutcome, OperationError> {
		let request = SwapRequest {
			from: self.registry.by_symbol(from)?.clone(),
			to: self.registry.by_symbol(to)?.clone(),
			percent_bps,
		};
		self.swaps.execute(&request).await
	}

	/// Adds liquidity to the `token_a`/`token_b` pool.
	pub async fn add_liquidity(
		&self,
		token_a: &str,
		token_b: &str,
		percent_bps: u16,
		stable: bool,
	) -> Result<OperationOutcome, OperationError> {
		let request = LiquidityRequest {
			token_a: self.registry.by_symbol(token_a)?.clone(),
			token_b: self.registry.by_symbol(token_b)?.clone(),
			percent_bps,
			stable,
		};
		self.liquidity.execute(&request).await
	}

	/// Runs one plan step. Pre-flight failures become
	/// [`OperationOutcome::Skipped`].
	pub async fn run_step(&self, step: &PlanStep) -> Result<OperationOutcome, OperationError> {
		let result = match step {
			PlanStep::Swap {
				from,
				to,
				percent_bps,
			} => self.swap(from, to, *percent_bps).await,
			PlanStep::AddLiquidity {
				token_a,
				token_b,
				percent_bps,
				stable,
			} => {
				self.add_liquidity(token_a, token_b, *percent_bps, *stable)
					.await
			},
		};

		match result {
			Err(e) if e.is_skip() => {
				tracing::warn!("Skipping step: {}", e);
				Ok(OperationOutcome::Skipped(e.to_string()))
			},
			other => other,
		}
	}

	/// Sleeps for a random whole number of seconds within the configured
	/// pause range.
	async fn pause(&self) {
		if self.pause.is_zero() {
			return;
		}
		let seconds = rand::thread_rng().gen_range(self.pause.min..=self.pause.max);
		tracing::info!("Pausing {}s before the next step", seconds);
		tokio::time::sleep(Duration::from_secs(seconds)).await;
	}

	/// Runs `plan` in order, pausing before each step.
	///
	/// Errors are recorded and the plan moves on, except for approval
	/// failures, which stop this wallet.
	#[instrument(skip_all, fields(wallet = %truncate_id(&self.address().to_string())))]
	pub async fn run_plan(&self, plan: &[PlanStep]) -> PlanReport {
		let mut steps = Vec::with_capacity(plan.len());
		let mut aborted = false;

		for (index, step) in plan.iter().enumerate() {
			self.pause().await;
			let result = self.run_step(step).await;
			let fatal = match &result {
				Ok(outcome) => {
					tracing::info!(step = index, ?outcome, "Step finished");
					false
				},
				Err(e) => {
					tracing::error!(step = index, error = %e, "Step failed");
					e.is_fatal()
				},
			};
			steps.push(StepReport { index, result });

			if fatal {
				tracing::error!("Stopping wallet after fatal error");
				aborted = index + 1 < plan.len();
				break;
			}
		}

		PlanReport {
			address: self.address(),
			steps,
			aborted,
		}
	}

	/// Native balance, nonce and balances of every registered token.
	pub async fn report(&self) -> Result<WalletReport, BalanceError> {
		let tokens: Vec<Address> = self
			.registry
			.tokens()
			.iter()
			.map(|token| token.address)
			.collect();
		self.balances.wallet_report(&tokens).await
	}

	/// Value of each token in `report` expressed in `target`, or `None` where
	/// the router has no quote.
	pub async fn valuation(
		&self,
		report: &WalletReport,
		target: &str,
	) -> Result<Vec<Option<U256>>, OperationError> {
		let target = self.registry.by_symbol(target)?.address;
		Ok(self.quotes.value_holdings(&report.tokens, target).await?)
	}
}
