//! Configuration module for the DEX executor.
//!
//! This module provides structures and utilities for managing executor
//! configuration. It supports loading configuration from TOML files and
//! validates that every referenced token, percentage and timeout is usable
//! before any component is constructed.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files for better organization:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use dex_types::{Address, SecretString, TokenConfig, TokenRegistry, MULTICALL3_ADDRESS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the DEX executor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// RPC endpoint and fee mode.
	pub network: NetworkConfig,
	/// Transaction delivery parameters.
	#[serde(default)]
	pub delivery: DeliveryConfig,
	/// Router, factory, multicall and wrapped-native addresses.
	pub contracts: ContractsConfig,
	/// Slippage, deadlines and pacing.
	#[serde(default)]
	pub trading: TradingConfig,
	/// Token registry entries.
	pub tokens: Vec<TokenConfig>,
	/// Wallets operated by the executor.
	#[serde(default)]
	pub wallets: Vec<WalletConfig>,
	/// Steps executed for every wallet by the `run` command.
	#[serde(default)]
	pub plan: Vec<PlanStep>,
}

/// RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Human-readable network name, used in logs.
	pub name: String,
	/// JSON-RPC endpoint.
	pub rpc_url: String,
	/// Explorer transaction URL prefix, e.g. `https://explorer.example/tx/`.
	pub explorer_url: Option<String>,
	/// Use EIP-1559 fee fields; legacy gas price otherwise.
	#[serde(default = "default_eip1559")]
	pub eip1559: bool,
}

fn default_eip1559() -> bool {
	true
}

/// Transaction delivery parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
	/// Seconds to wait for a submitted transaction to be mined.
	#[serde(default = "default_receipt_timeout_seconds")]
	pub receipt_timeout_seconds: u64,
	/// Delay between receipt queries, in milliseconds.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Blocks sampled by `eth_feeHistory`.
	#[serde(default = "default_fee_history_blocks")]
	pub fee_history_blocks: u64,
	/// Reward percentile requested from `eth_feeHistory`.
	#[serde(default = "default_priority_fee_percentile")]
	pub priority_fee_percentile: f64,
	/// Legacy gas price multiplier, in percent.
	#[serde(default = "default_legacy_multiplier")]
	pub legacy_gas_price_multiplier_percent: u64,
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			receipt_timeout_seconds: default_receipt_timeout_seconds(),
			poll_interval_ms: default_poll_interval_ms(),
			fee_history_blocks: default_fee_history_blocks(),
			priority_fee_percentile: default_priority_fee_percentile(),
			legacy_gas_price_multiplier_percent: default_legacy_multiplier(),
		}
	}
}

fn default_receipt_timeout_seconds() -> u64 {
	300
}

fn default_poll_interval_ms() -> u64 {
	2000
}

fn default_fee_history_blocks() -> u64 {
	5
}

fn default_priority_fee_percentile() -> f64 {
	80.0
}

fn default_legacy_multiplier() -> u64 {
	110
}

/// Contract addresses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractsConfig {
	/// AMM router.
	pub router: Address,
	/// Pool factory; the router's `defaultFactory()` is used when absent.
	pub factory: Option<Address>,
	/// Multicall3 deployment.
	#[serde(default = "default_multicall")]
	pub multicall: Address,
	/// Wrapped native token. Balances of this token are read as native balance.
	pub wrapped_native: Address,
}

fn default_multicall() -> Address {
	MULTICALL3_ADDRESS
}

/// Trading parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingConfig {
	/// Slippage tolerance in basis points.
	#[serde(default = "default_slippage_bps")]
	pub slippage_bps: u16,
	/// Seconds from now until a swap expires.
	#[serde(default = "default_swap_deadline_seconds")]
	pub swap_deadline_seconds: u64,
	/// Seconds from now until a liquidity addition expires.
	#[serde(default = "default_liquidity_deadline_seconds")]
	pub liquidity_deadline_seconds: u64,
	/// Random pause before each plan step of one wallet.
	#[serde(default)]
	pub pause_seconds: PauseRange,
}

impl Default for TradingConfig {
	fn default() -> Self {
		Self {
			slippage_bps: default_slippage_bps(),
			swap_deadline_seconds: default_swap_deadline_seconds(),
			liquidity_deadline_seconds: default_liquidity_deadline_seconds(),
			pause_seconds: PauseRange::default(),
		}
	}
}

/// Bounds of a random pause, in whole seconds.
///
/// Written as a single number for a fixed pause or as `[min, max]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "PauseSeconds", into = "PauseSeconds")]
pub struct PauseRange {
	pub min: u64,
	pub max: u64,
}

impl PauseRange {
	pub fn is_zero(&self) -> bool {
		self.max == 0
	}
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum PauseSeconds {
	Fixed(u64),
	Range([u64; 2]),
}

impl TryFrom<PauseSeconds> for PauseRange {
	type Error = String;

	fn try_from(value: PauseSeconds) -> Result<Self, Self::Error> {
		match value {
			PauseSeconds::Fixed(seconds) => Ok(Self {
				min: seconds,
				max: seconds,
			}),
			PauseSeconds::Range([min, max]) if min <= max => Ok(Self { min, max }),
			PauseSeconds::Range([min, max]) => Err(format!(
				"pause_seconds minimum {} exceeds maximum {}",
				min, max
			)),
		}
	}
}

impl From<PauseRange> for PauseSeconds {
	fn from(range: PauseRange) -> Self {
		PauseSeconds::Range([range.min, range.max])
	}
}

fn default_slippage_bps() -> u16 {
	500
}

fn default_swap_deadline_seconds() -> u64 {
	900
}

fn default_liquidity_deadline_seconds() -> u64 {
	600
}

/// A wallet operated by the executor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Hex private key, normally supplied as `${ENV_VAR}`.
	pub private_key: SecretString,
	/// HTTP proxy for this wallet's RPC traffic (`user:pass@host:port` or URL).
	pub proxy: Option<String>,
}

/// One step of the per-wallet plan.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanStep {
	/// Swap `percent_bps` of the `from` balance into `to`.
	Swap {
		from: String,
		to: String,
		percent_bps: u16,
	},
	/// Add liquidity to the `token_a`/`token_b` pool using up to
	/// `percent_bps` of the `token_a` balance.
	AddLiquidity {
		token_a: String,
		token_b: String,
		percent_bps: u16,
		#[serde(default)]
		stable: bool,
	},
}

impl PlanStep {
	fn symbols(&self) -> [&str; 2] {
		match self {
			PlanStep::Swap { from, to, .. } => [from.as_str(), to.as_str()],
			PlanStep::AddLiquidity {
				token_a, token_b, ..
			} => [token_a.as_str(), token_b.as_str()],
		}
	}

	fn percent_bps(&self) -> u16 {
		match self {
			PlanStep::Swap { percent_bps, .. } | PlanStep::AddLiquidity { percent_bps, .. } => {
				*percent_bps
			},
		}
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file with environment variable resolution.
	///
	/// This method supports modular configuration through include directives:
	/// - `include = ["tokens.toml", "wallets.toml"]` - Include specific files
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Builds the token registry from the `[[tokens]]` entries.
	pub fn token_registry(&self) -> Result<TokenRegistry, ConfigError> {
		TokenRegistry::new(self.tokens.clone()).map_err(|e| ConfigError::Validation(e.to_string()))
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - RPC URL is not empty
	/// - Token symbols and addresses are unique
	/// - The wrapped native token and every plan symbol are registered
	/// - Slippage is below 100% and plan percentages are in (0, 100%]
	/// - Receipt timeout is positive and the gas margin at most 100%
	fn validate(&self) -> Result<(), ConfigError> {
		if self.network.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation("Network rpc_url cannot be empty".into()));
		}

		let registry = self.token_registry()?;
		if registry.by_address(&self.contracts.wrapped_native).is_none() {
			return Err(ConfigError::Validation(format!(
				"Wrapped native token {} must be listed in [[tokens]]",
				self.contracts.wrapped_native
			)));
		}

		if self.trading.slippage_bps >= 10_000 {
			return Err(ConfigError::Validation(format!(
				"slippage_bps must be below 10000, got {}",
				self.trading.slippage_bps
			)));
		}

		if self.delivery.receipt_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"receipt_timeout_seconds must be greater than 0".into(),
			));
		}

		for (index, step) in self.plan.iter().enumerate() {
			for symbol in step.symbols() {
				registry.by_symbol(symbol).map_err(|e| {
					ConfigError::Validation(format!("Plan step {}: {}", index + 1, e))
				})?;
			}
			let [first, second] = step.symbols();
			if first == second {
				return Err(ConfigError::Validation(format!(
					"Plan step {} uses {} on both sides",
					index + 1,
					first
				)));
			}
			let percent = step.percent_bps();
			if percent == 0 || percent > 10_000 {
				return Err(ConfigError::Validation(format!(
					"Plan step {}: percent_bps must be in 1..=10000, got {}",
					index + 1,
					percent
				)));
			}
		}

		for (index, wallet) in self.wallets.iter().enumerate() {
			if wallet.private_key.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Wallet {} has an empty private_key",
					index + 1
				)));
			}
			if self.wallets[..index]
				.iter()
				.any(|other| other.private_key == wallet.private_key)
			{
				return Err(ConfigError::Validation(format!(
					"Wallet {} ({}) is listed more than once",
					index + 1,
					wallet.private_key.masked()
				)));
			}
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is automatically
/// validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[network]
name = "xrpl-evm-testnet"
rpc_url = "https://rpc.testnet.xrplevm.org"
explorer_url = "https://explorer.testnet.xrplevm.org/tx/"

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
"#;

	fn with(extra: &str) -> String {
		format!("{}\n{}", BASE, extra)
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("DEX_TEST_HOST", "localhost");
		std::env::set_var("DEX_TEST_PORT", "8545");

		let input = "rpc_url = \"http://${DEX_TEST_HOST}:${DEX_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "rpc_url = \"http://localhost:8545\"");

		std::env::remove_var("DEX_TEST_HOST");
		std::env::remove_var("DEX_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${DEX_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${DEX_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("DEX_MISSING_VAR"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE.parse().unwrap();
		assert!(config.network.eip1559);
		assert_eq!(config.delivery.receipt_timeout_seconds, 300);
		assert_eq!(config.delivery.fee_history_blocks, 5);
		assert_eq!(config.delivery.priority_fee_percentile, 80.0);
		assert_eq!(config.delivery.legacy_gas_price_multiplier_percent, 110);
		assert_eq!(config.contracts.multicall, MULTICALL3_ADDRESS);
		assert_eq!(config.contracts.factory, None);
		assert_eq!(config.trading.slippage_bps, 500);
		assert_eq!(config.trading.swap_deadline_seconds, 900);
		assert_eq!(config.trading.liquidity_deadline_seconds, 600);
		assert!(config.trading.pause_seconds.is_zero());
		assert!(config.wallets.is_empty());
		assert_eq!(config.token_registry().unwrap().len(), 2);
	}

	#[test]
	fn test_wallets_from_env_and_plan() {
		std::env::set_var(
			"DEX_TEST_WALLET_KEY",
			"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
		);
		let config: Config = with(
			r#"
[[wallets]]
private_key = "${DEX_TEST_WALLET_KEY}"
proxy = "user:pass@127.0.0.1:8080"

[[plan]]
action = "swap"
from = "WXRP"
to = "RISE"
percent_bps = 2500

[[plan]]
action = "add_liquidity"
token_a = "RISE"
token_b = "WXRP"
percent_bps = 5000
"#,
		)
		.parse()
		.unwrap();
		std::env::remove_var("DEX_TEST_WALLET_KEY");

		assert_eq!(config.wallets.len(), 1);
		assert_eq!(config.wallets[0].private_key.masked(), "...ff80");
		assert_eq!(config.wallets[0].proxy.as_deref(), Some("user:pass@127.0.0.1:8080"));
		assert_eq!(
			config.plan,
			vec![
				PlanStep::Swap {
					from: "WXRP".into(),
					to: "RISE".into(),
					percent_bps: 2500,
				},
				PlanStep::AddLiquidity {
					token_a: "RISE".into(),
					token_b: "WXRP".into(),
					percent_bps: 5000,
					stable: false,
				},
			]
		);
	}

	#[test]
	fn test_unknown_plan_symbol_rejected() {
		let result = with(
			r#"
[[plan]]
action = "swap"
from = "WXRP"
to = "RIBBIT"
percent_bps = 100
"#,
		)
		.parse::<Config>();
		let err = result.unwrap_err().to_string();
		assert!(err.contains("RIBBIT"), "unexpected error: {}", err);
	}

	#[test]
	fn test_percent_bounds_rejected() {
		for percent in [0, 10_001] {
			let result = with(&format!(
				r#"
[[plan]]
action = "swap"
from = "WXRP"
to = "RISE"
percent_bps = {}
"#,
				percent
			))
			.parse::<Config>();
			assert!(matches!(result, Err(ConfigError::Validation(_))));
		}
	}

	#[test]
	fn test_unregistered_wrapped_native_rejected() {
		let config = BASE.replace(
			"wrapped_native = \"0x81Be083099c2C65b062378E74Fa8469644347BB7\"",
			"wrapped_native = \"0x0000000000000000000000000000000000000001\"",
		);
		let result = config.parse::<Config>();
		assert!(result.unwrap_err().to_string().contains("Wrapped native"));
	}

	#[test]
	fn test_duplicate_symbol_rejected() {
		let result = with(
			r#"
[[tokens]]
symbol = "RISE"
address = "0x73ee7BC68d3f07CfcD68776512b7317FE57E1939"
decimals = 18
"#,
		)
		.parse::<Config>();
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("Duplicate token symbol"));
	}

	#[test]
	fn test_slippage_and_timeout_bounds() {
		let result = with("[trading]\nslippage_bps = 10000\n").parse::<Config>();
		assert!(matches!(result, Err(ConfigError::Validation(_))));

		let result = with("[delivery]\nreceipt_timeout_seconds = 0\n").parse::<Config>();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_pause_fixed_or_range() {
		let config: Config = with("[trading]\npause_seconds = 10\n").parse().unwrap();
		assert_eq!(config.trading.pause_seconds, PauseRange { min: 10, max: 10 });

		let config: Config = with("[trading]\npause_seconds = [10, 30]\n").parse().unwrap();
		assert_eq!(config.trading.pause_seconds, PauseRange { min: 10, max: 30 });

		let result = with("[trading]\npause_seconds = [30, 10]\n").parse::<Config>();
		assert!(result.is_err());
	}

	#[test]
	fn test_gas_margin_not_configurable() {
		let result = with("[delivery]\ngas_margin_percent = 20\n").parse::<Config>();
		assert!(result.is_err());

		let config: Config = with("[delivery]\npoll_interval_ms = 500\n").parse().unwrap();
		assert_eq!(config.delivery.poll_interval_ms, 500);
	}

	#[test]
	fn test_legacy_fee_mode() {
		let config: Config = BASE
			.replace(
				"explorer_url = \"https://explorer.testnet.xrplevm.org/tx/\"",
				"eip1559 = false",
			)
			.parse()
			.unwrap();
		assert!(!config.network.eip1559);
		assert_eq!(config.network.explorer_url, None);
	}
}
