//! Main entry point for the DEX executor.
//!
//! Loads the configuration, builds one executor per configured wallet and
//! runs the requested command for all of them concurrently. Wallets without
//! a proxy share one HTTP connection pool; a proxied wallet gets its own.

use clap::{Parser, Subcommand};
use dex_account::implementations::local::create_account;
use dex_account::AccountService;
use dex_config::{Config, PlanStep};
use dex_core::{OperationOutcome, WalletExecutor};
use dex_delivery::implementations::evm::alloy::{build_http_client, AlloyChainClient};
use dex_delivery::ChainClient;
use dex_types::format_token_amount;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line arguments for the executor.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/xrpl-testnet.toml", env = "DEX_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Only act for the wallet at this index in the configuration
	#[arg(short, long)]
	wallet: Option<usize>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
	/// Show native and token balances of every wallet
	Balances {
		/// Also value each holding in this token
		#[arg(long)]
		value_in: Option<String>,
	},
	/// Run the configured plan for every wallet
	Run,
	/// Swap a share of one token's balance into another
	Swap {
		#[arg(long)]
		from: String,
		#[arg(long)]
		to: String,
		/// Share of the balance to swap, in basis points
		#[arg(long, default_value_t = 10_000)]
		percent_bps: u16,
	},
	/// Add liquidity to a pool
	AddLiquidity {
		#[arg(long)]
		token_a: String,
		#[arg(long)]
		token_b: String,
		/// Share of the token A balance to deposit, in basis points
		#[arg(long, default_value_t = 10_000)]
		percent_bps: u16,
		#[arg(long)]
		stable: bool,
	},
}

impl Command {
	/// The plan run by a trading command, or `None` for reports.
	fn plan(&self, config: &Config) -> Option<Vec<PlanStep>> {
		match self {
			Command::Balances { .. } => None,
			Command::Run => Some(config.plan.clone()),
			Command::Swap {
				from,
				to,
				percent_bps,
			} => Some(vec![PlanStep::Swap {
				from: from.clone(),
				to: to.clone(),
				percent_bps: *percent_bps,
			}]),
			Command::AddLiquidity {
				token_a,
				token_b,
				percent_bps,
				stable,
			} => Some(vec![PlanStep::AddLiquidity {
				token_a: token_a.clone(),
				token_b: token_b.clone(),
				percent_bps: *percent_bps,
				stable: *stable,
			}]),
		}
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(path).await?;
	tracing::info!("Loaded configuration [{}]", config.network.name);

	let executors = build_executors(&config, args.wallet)?;
	tracing::info!("Loaded {} wallet(s)", executors.len());

	match args.command.plan(&config) {
		Some(plan) => run_plans(&executors, &plan).await,
		None => {
			let value_in = match &args.command {
				Command::Balances { value_in } => value_in.as_deref(),
				_ => None,
			};
			report_balances(&config, &executors, value_in).await;
		},
	}

	Ok(())
}

/// Builds an executor for every configured wallet, or only for `only`.
fn build_executors(
	config: &Config,
	only: Option<usize>,
) -> Result<Vec<WalletExecutor>, Box<dyn std::error::Error>> {
	let registry = Arc::new(config.token_registry()?);
	let shared: Arc<dyn ChainClient> = Arc::new(AlloyChainClient::new(
		&config.network.rpc_url,
		build_http_client(None)?,
	)?);

	let mut executors = Vec::new();
	for (index, wallet) in config.wallets.iter().enumerate() {
		if only.is_some_and(|selected| selected != index) {
			continue;
		}

		let client: Arc<dyn ChainClient> = match &wallet.proxy {
			Some(proxy) => Arc::new(AlloyChainClient::new(
				&config.network.rpc_url,
				build_http_client(Some(proxy))?,
			)?),
			None => shared.clone(),
		};
		let account = Arc::new(AccountService::new(create_account(&wallet.private_key)?));
		tracing::info!(
			wallet = index,
			address = %account.address(),
			proxied = wallet.proxy.is_some(),
			"Loaded wallet"
		);

		executors.push(WalletExecutor::new(config, registry.clone(), client, account));
	}

	if executors.is_empty() {
		return Err("No wallets selected".into());
	}
	Ok(executors)
}

async fn run_plans(executors: &[WalletExecutor], plan: &[PlanStep]) {
	let reports = join_all(executors.iter().map(|executor| executor.run_plan(plan))).await;

	for report in reports {
		let skipped = report
			.steps
			.iter()
			.filter(|step| matches!(step.result, Ok(OperationOutcome::Skipped(_))))
			.count();
		let failed = report.steps.iter().filter(|step| step.result.is_err()).count();
		tracing::info!(
			wallet = %report.address,
			confirmed = report.confirmed(),
			skipped,
			failed,
			aborted = report.aborted,
			"Plan finished"
		);
	}
}

async fn report_balances(config: &Config, executors: &[WalletExecutor], value_in: Option<&str>) {
	let reports = join_all(executors.iter().map(|executor| async move {
		let report = executor.report().await?;
		let values = match value_in {
			Some(target) => Some(executor.valuation(&report, target).await?),
			None => None,
		};
		Ok::<_, Box<dyn std::error::Error + Send + Sync>>((report, values))
	}))
	.await;

	for (executor, result) in executors.iter().zip(reports) {
		let (report, values) = match result {
			Ok(result) => result,
			Err(e) => {
				tracing::error!(wallet = %executor.address(), error = %e, "Balance report failed");
				continue;
			},
		};

		tracing::info!(
			wallet = %report.address,
			nonce = report.nonce,
			"Native: {}",
			format_token_amount(report.native, 18)
		);
		for (index, token) in config.tokens.iter().enumerate() {
			let Some(balance) = report.tokens.get(index) else {
				continue;
			};
			let value = values
				.as_ref()
				.and_then(|values| values.get(index).copied().flatten());
			tracing::info!(
				wallet = %report.address,
				token = %token.symbol,
				name = %balance.name,
				value = %value.map(|v| v.to_string()).unwrap_or_default(),
				"Balance: {}",
				format_token_amount(balance.amount, balance.decimals)
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const CONFIG: &str = r#"
[network]
name = "xrpl-evm-testnet"
rpc_url = "https://rpc.testnet.xrplevm.org"

[contracts]
router = "0x25734cf60ca932A57A31984240DbF32215Fd96b7"
wrapped_native = "0x81Be083099c2C65b062378E74Fa8469644347BB7"

[[tokens]]
symbol = "WXRP"
address = "0x81Be083099c2C65b062378E74Fa8469644347BB7"
decimals = 18

[[tokens]]
symbol = "RISE"
address = "0x0c28777DEebe4589e83EF2Dc7833354e6a0aFF85"
decimals = 18

[[wallets]]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[[wallets]]
private_key = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
proxy = "user:pass@127.0.0.1:8080"

[[plan]]
action = "swap"
from = "WXRP"
to = "RISE"
percent_bps = 2500
"#;

	#[test]
	fn test_args_defaults() {
		let args = Args::try_parse_from(["dex-executor", "run"]).unwrap();
		assert_eq!(args.config, PathBuf::from("config/xrpl-testnet.toml"));
		assert_eq!(args.log_level, "info");
		assert_eq!(args.wallet, None);
		assert_eq!(args.command, Command::Run);
	}

	#[test]
	fn test_swap_args() {
		let args = Args::try_parse_from([
			"dex-executor",
			"--wallet",
			"1",
			"swap",
			"--from",
			"RISE",
			"--to",
			"WXRP",
			"--percent-bps",
			"5000",
		])
		.unwrap();
		assert_eq!(args.wallet, Some(1));
		assert_eq!(
			args.command,
			Command::Swap {
				from: "RISE".to_string(),
				to: "WXRP".to_string(),
				percent_bps: 5_000,
			}
		);
	}

	#[test]
	fn test_swap_requires_tokens() {
		assert!(Args::try_parse_from(["dex-executor", "swap", "--from", "RISE"]).is_err());
	}

	#[test]
	fn test_command_plans() {
		let config: Config = CONFIG.parse().unwrap();

		assert_eq!(Command::Run.plan(&config), Some(config.plan.clone()));
		assert_eq!(Command::Balances { value_in: None }.plan(&config), None);
		assert_eq!(
			Command::AddLiquidity {
				token_a: "WXRP".to_string(),
				token_b: "RISE".to_string(),
				percent_bps: 1_000,
				stable: false,
			}
			.plan(&config),
			Some(vec![PlanStep::AddLiquidity {
				token_a: "WXRP".to_string(),
				token_b: "RISE".to_string(),
				percent_bps: 1_000,
				stable: false,
			}])
		);
	}

	#[test]
	fn test_build_executors() {
		let config: Config = CONFIG.parse().unwrap();

		let all = build_executors(&config, None).unwrap();
		assert_eq!(all.len(), 2);
		assert_eq!(
			all[0].address().to_string(),
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
		);

		let second = build_executors(&config, Some(1)).unwrap();
		assert_eq!(second.len(), 1);
		assert_eq!(
			second[0].address().to_string(),
			"0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
		);

		assert!(build_executors(&config, Some(5)).is_err());
	}
}
