//! Liquidity additions.
//!
//! The first leg is sized from its balance and capped by what the second
//! leg's balance can pair with; the second leg follows the pool ratio. When
//! either leg is the wrapped-native token the router's `addLiquidityETH` is
//! used and the native leg travels as value.

use super::{deadline, submit};
use crate::balance::BalanceService;
use crate::contracts;
use crate::error::{OperationError, OperationOutcome};
use crate::quote::{LiquidityQuote, QuoteEngine};
use dex_delivery::{ContractCall, TransactionBuilder};
use dex_types::abi::IRouter;
use dex_types::{format_token_amount, truncate_id, Address, TokenBalance, TokenConfig};
use std::sync::Arc;
use tracing::instrument;

/// Add liquidity to the `token_a`/`token_b` pool using up to `percent_bps`
/// of the `token_a` balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityRequest {
	pub token_a: TokenConfig,
	pub token_b: TokenConfig,
	pub percent_bps: u16,
	pub stable: bool,
}

pub struct LiquidityWorkflow {
	builder: Arc<TransactionBuilder>,
	balances: Arc<BalanceService>,
	quotes: Arc<QuoteEngine>,
	deadline_seconds: u64,
}

impl LiquidityWorkflow {
	pub fn new(
		builder: Arc<TransactionBuilder>,
		balances: Arc<BalanceService>,
		quotes: Arc<QuoteEngine>,
		deadline_seconds: u64,
	) -> Self {
		Self {
			builder,
			balances,
			quotes,
			deadline_seconds,
		}
	}

	#[instrument(skip_all, fields(
		wallet = %truncate_id(&self.builder.address().to_string()),
		pair = %format!("{}/{}", request.token_a.symbol, request.token_b.symbol),
	))]
	pub async fn execute(
		&self,
		request: &LiquidityRequest,
	) -> Result<OperationOutcome, OperationError> {
		let (token_a, token_b) = (&request.token_a, &request.token_b);

		let balance_a = self.non_zero_balance(token_a).await?;
		let balance_b = self.non_zero_balance(token_b).await?;

		let quote = self
			.quotes
			.liquidity_quote(
				token_a.address,
				token_b.address,
				request.stable,
				balance_a.amount,
				balance_b.amount,
				request.percent_bps,
			)
			.await?;
		if quote.amount_a_desired.is_zero() {
			tracing::warn!("Amount of {} rounds down to zero", token_a.symbol);
			return Err(OperationError::InsufficientBalance {
				token: token_a.symbol.clone(),
				available: balance_a.amount,
			});
		}
		if quote.amount_b_desired.is_zero() || quote.amount_b_desired > balance_b.amount {
			tracing::warn!(
				required = %format_token_amount(quote.amount_b_desired, token_b.decimals),
				"Not enough {} to pair",
				token_b.symbol
			);
			return Err(OperationError::InsufficientBalance {
				token: token_b.symbol.clone(),
				available: balance_b.amount,
			});
		}
		tracing::info!(
			amount_a = %format_token_amount(quote.amount_a_desired, token_a.decimals),
			amount_b = %format_token_amount(quote.amount_b_desired, token_b.decimals),
			"Quoted"
		);

		let router = self.quotes.router();
		for (token, amount) in [
			(token_a.address, quote.amount_a_desired),
			(token_b.address, quote.amount_b_desired),
		] {
			if !self.balances.is_native(token) {
				self.balances.ensure_allowance(token, router, amount).await?;
			}
		}
		tracing::info!("Approval checked");

		let call = self.liquidity_call(router, request, &quote);
		submit(&self.builder, call).await
	}

	async fn non_zero_balance(&self, token: &TokenConfig) -> Result<TokenBalance, OperationError> {
		let balance = self.balances.get_balance(token.address).await?;
		if balance.amount.is_zero() {
			tracing::warn!("No {} balance", token.symbol);
			return Err(OperationError::InsufficientBalance {
				token: token.symbol.clone(),
				available: balance.amount,
			});
		}
		Ok(balance)
	}

	fn liquidity_call(
		&self,
		router: Address,
		request: &LiquidityRequest,
		quote: &LiquidityQuote,
	) -> ContractCall {
		let to = self.builder.address();
		let deadline = deadline(self.deadline_seconds);
		let (a, b) = (request.token_a.address, request.token_b.address);

		if self.balances.is_native(a) {
			contracts::write_payable(
				router,
				&IRouter::addLiquidityETHCall {
					token: b,
					stable: request.stable,
					amountTokenDesired: quote.amount_b_desired,
					amountTokenMin: quote.amount_b_min,
					amountETHMin: quote.amount_a_min,
					to,
					deadline,
				},
				quote.amount_a_desired,
			)
		} else if self.balances.is_native(b) {
			contracts::write_payable(
				router,
				&IRouter::addLiquidityETHCall {
					token: a,
					stable: request.stable,
					amountTokenDesired: quote.amount_a_desired,
					amountTokenMin: quote.amount_a_min,
					amountETHMin: quote.amount_b_min,
					to,
					deadline,
				},
				quote.amount_b_desired,
			)
		} else {
			contracts::write(
				router,
				&IRouter::addLiquidityCall {
					tokenA: a,
					tokenB: b,
					stable: request.stable,
					amountADesired: quote.amount_a_desired,
					amountBDesired: quote.amount_b_desired,
					amountAMin: quote.amount_a_min,
					amountBMin: quote.amount_b_min,
					to,
					deadline,
				},
			)
		}
	}
}
