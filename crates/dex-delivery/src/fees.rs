//! Fee estimation.
//!
//! EIP-1559 networks get a priority fee averaged over the non-zero rewards of
//! the last few blocks; legacy networks get the node's gas price inflated by a
//! fixed percentage. The mode is a static configuration flag.

use crate::{ChainClient, DeliveryError};
use dex_types::FeeQuote;
use std::sync::Arc;

/// Fee estimation parameters.
#[derive(Debug, Clone)]
pub struct FeeConfig {
	/// Use EIP-1559 fee fields instead of a legacy gas price.
	pub eip1559: bool,
	/// Number of recent blocks sampled by `eth_feeHistory`.
	pub history_blocks: u64,
	/// Reward percentile requested from `eth_feeHistory`.
	pub reward_percentile: f64,
	/// Legacy gas price multiplier, in percent of the node's suggestion.
	pub legacy_multiplier_percent: u64,
}

impl Default for FeeConfig {
	fn default() -> Self {
		Self {
			eip1559: true,
			history_blocks: 5,
			reward_percentile: 80.0,
			legacy_multiplier_percent: 110,
		}
	}
}

/// Produces a [`FeeQuote`] for the next transaction.
///
/// Nothing is cached; every call queries the node.
pub struct FeeEstimator {
	client: Arc<dyn ChainClient>,
	config: FeeConfig,
}

impl FeeEstimator {
	pub fn new(client: Arc<dyn ChainClient>, config: FeeConfig) -> Self {
		Self { client, config }
	}

	/// Queries the node and builds the fee fields for the configured mode.
	pub async fn estimate(&self) -> Result<FeeQuote, DeliveryError> {
		if !self.config.eip1559 {
			let gas_price = self.client.gas_price().await?;
			let gas_price = gas_price.saturating_mul(self.config.legacy_multiplier_percent as u128) / 100;
			tracing::debug!(gas_price, "Estimated legacy gas price");
			return Ok(FeeQuote::Legacy { gas_price });
		}

		let history = self
			.client
			.fee_history(self.config.history_blocks, self.config.reward_percentile)
			.await?;
		let priority_fee = average_priority_fee(&history.rewards);
		let quote = FeeQuote::eip1559(history.latest_base_fee, priority_fee);
		tracing::debug!(
			base_fee = history.latest_base_fee,
			priority_fee,
			max_fee = quote.max_price_per_gas(),
			"Estimated EIP-1559 fees"
		);
		Ok(quote)
	}
}

/// Mean of the non-zero rewards rounded half to even, or zero when every
/// sampled block paid no tip.
pub fn average_priority_fee(rewards: &[u128]) -> u128 {
	let non_zero: Vec<u128> = rewards.iter().copied().filter(|r| *r > 0).collect();
	if non_zero.is_empty() {
		return 0;
	}
	let count = non_zero.len() as u128;
	let sum = non_zero
		.iter()
		.fold(0u128, |acc, reward| acc.saturating_add(*reward));
	let (quotient, remainder) = (sum / count, sum % count);
	let twice = remainder * 2;
	if twice > count || (twice == count && quotient % 2 == 1) {
		quotient + 1
	} else {
		quotient
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::mock::MockChainClient;
	use dex_types::FeeHistorySample;

	#[test]
	fn test_average_ignores_zero_rewards() {
		assert_eq!(average_priority_fee(&[0, 0, 5, 10, 0]), 8);
		assert_eq!(average_priority_fee(&[3, 3, 3]), 3);
		assert_eq!(average_priority_fee(&[1, 2]), 2);
		assert_eq!(average_priority_fee(&[1, 4]), 2);
		assert_eq!(average_priority_fee(&[3, 4]), 4);
	}

	#[test]
	fn test_average_of_empty_or_zero_rewards() {
		assert_eq!(average_priority_fee(&[]), 0);
		assert_eq!(average_priority_fee(&[0, 0, 0]), 0);
	}

	#[tokio::test]
	async fn test_eip1559_quote_from_history() {
		let client = Arc::new(MockChainClient::new(1));
		client.set_fee_history(FeeHistorySample {
			latest_base_fee: 100,
			rewards: vec![0, 0, 5, 10, 0],
		});
		let estimator = FeeEstimator::new(client.clone(), FeeConfig::default());

		let quote = estimator.estimate().await.unwrap();
		assert_eq!(
			quote,
			FeeQuote::Eip1559 {
				max_priority_fee_per_gas: 8,
				max_fee_per_gas: 108,
			}
		);
		assert!(!client.method_log().contains(&"eth_gasPrice"));
	}

	#[tokio::test]
	async fn test_zero_priority_falls_back_to_base_fee() {
		let client = Arc::new(MockChainClient::new(1));
		client.set_fee_history(FeeHistorySample {
			latest_base_fee: 100,
			rewards: vec![0, 0, 0, 0, 0],
		});
		let estimator = FeeEstimator::new(client, FeeConfig::default());

		let quote = estimator.estimate().await.unwrap();
		assert_eq!(
			quote,
			FeeQuote::Eip1559 {
				max_priority_fee_per_gas: 100,
				max_fee_per_gas: 200,
			}
		);
	}

	#[tokio::test]
	async fn test_legacy_gas_price_multiplier() {
		let client = Arc::new(MockChainClient::new(1));
		client.set_gas_price(1_000);
		let config = FeeConfig {
			eip1559: false,
			..FeeConfig::default()
		};
		let estimator = FeeEstimator::new(client.clone(), config);

		let quote = estimator.estimate().await.unwrap();
		assert_eq!(quote, FeeQuote::Legacy { gas_price: 1_100 });
		assert!(!client.method_log().contains(&"eth_feeHistory"));
	}
}
