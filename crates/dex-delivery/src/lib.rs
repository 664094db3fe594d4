//! Transaction delivery module for the DEX executor.
//!
//! This module owns every interaction with the RPC endpoint. It exposes the
//! chain-client capability as the [`ChainClient`] trait, estimates fees,
//! and drives the build → sign → submit → confirm lifecycle of a transaction
//! through [`TransactionBuilder`].

use async_trait::async_trait;
use dex_types::{
	Address, Bytes, FeeHistorySample, Transaction, TransactionReceipt, TxHash, U256,
};
use thiserror::Error;

pub mod builder;
pub mod fees;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	#[cfg(any(test, feature = "testing"))]
	pub mod mock;
}

pub use builder::{BuilderConfig, ContractCall, TransactionBuilder, GAS_MARGIN_PERCENT};
pub use fees::{FeeConfig, FeeEstimator};

/// Errors that can occur during chain interaction.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Connection or endpoint failure. Transient; not retried at this layer.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// The node refused to estimate gas because the call would revert.
	#[error("Gas estimation failed: {0}")]
	GasEstimation(String),
	/// A read-only call reverted.
	#[error("Call reverted: {0}")]
	CallReverted(String),
	/// Submitted but not confirmed before the deadline; the outcome is unknown.
	#[error("Transaction {hash} not confirmed after {seconds} seconds")]
	Timeout { hash: TxHash, seconds: u64 },
	/// The account could not sign the transaction.
	#[error("Signing failed: {0}")]
	Signing(#[from] dex_account::AccountError),
	/// Invalid endpoint, proxy or other local input.
	#[error("Invalid input: {0}")]
	InvalidInput(String),
}

impl DeliveryError {
	/// Revert reason reported by the node when the failure was a revert.
	pub fn revert_reason(&self) -> Option<&str> {
		match self {
			DeliveryError::GasEstimation(reason) | DeliveryError::CallReverted(reason) => Some(reason),
			_ => None,
		}
	}
}

/// Chain-client capability shared by every workflow.
///
/// One implementation talks JSON-RPC over HTTP; tests inject a scripted one.
/// Every method is a suspension point and none of them caches results.
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Current chain id.
	async fn chain_id(&self) -> Result<u64, DeliveryError>;

	/// Next nonce for `address`.
	async fn transaction_count(&self, address: Address) -> Result<u64, DeliveryError>;

	/// Native balance of `address`, in wei.
	async fn balance(&self, address: Address) -> Result<U256, DeliveryError>;

	/// Priority-fee rewards for the last `block_count` blocks at `reward_percentile`.
	async fn fee_history(
		&self,
		block_count: u64,
		reward_percentile: f64,
	) -> Result<FeeHistorySample, DeliveryError>;

	/// Legacy gas price suggestion, in wei.
	async fn gas_price(&self) -> Result<u128, DeliveryError>;

	/// Gas the node expects `tx` to use.
	///
	/// Fails with [`DeliveryError::GasEstimation`] when the call would revert.
	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError>;

	/// Executes a read-only call against the latest block.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError>;

	/// Broadcasts a signed payload and returns its hash.
	async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TxHash, DeliveryError>;

	/// Receipt for `hash`, or `None` while the transaction is not yet mined.
	async fn transaction_receipt(
		&self,
		hash: TxHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_revert_reason() {
		let estimation = DeliveryError::GasEstimation("execution reverted: EXPIRED".to_string());
		assert_eq!(estimation.revert_reason(), Some("execution reverted: EXPIRED"));

		let call = DeliveryError::CallReverted("Pair: Does not exist".to_string());
		assert_eq!(call.revert_reason(), Some("Pair: Does not exist"));

		let timeout = DeliveryError::Timeout {
			hash: TxHash::ZERO,
			seconds: 300,
		};
		assert_eq!(timeout.revert_reason(), None);
		assert_eq!(DeliveryError::Rpc("refused".to_string()).revert_reason(), None);
	}
}
