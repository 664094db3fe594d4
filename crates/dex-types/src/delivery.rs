//! Transaction delivery types for the executor.
//!
//! This module defines the types that flow through the transaction lifecycle:
//! fee quotes, the unsigned transaction envelope, the signed payload and the
//! receipt observed once the transaction is mined.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use serde::{Deserialize, Serialize};

/// Fee fields for a transaction.
///
/// The variant is chosen by the static fee-mode flag of the network
/// configuration, never auto-detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeQuote {
	/// EIP-1559 two-part fee. `max_fee_per_gas >= max_priority_fee_per_gas` always holds.
	Eip1559 {
		max_priority_fee_per_gas: u128,
		max_fee_per_gas: u128,
	},
	/// Single legacy gas price.
	Legacy { gas_price: u128 },
}

impl FeeQuote {
	/// Builds an EIP-1559 quote as `base_fee + priority_fee`.
	///
	/// A zero priority fee is replaced by the base fee so that the transaction
	/// is not deprioritized by block builders.
	pub fn eip1559(base_fee: u128, priority_fee: u128) -> Self {
		let priority = if priority_fee == 0 {
			base_fee
		} else {
			priority_fee
		};
		Self::Eip1559 {
			max_priority_fee_per_gas: priority,
			max_fee_per_gas: base_fee.saturating_add(priority),
		}
	}

	/// Upper bound of the per-gas price this quote may pay.
	pub fn max_price_per_gas(&self) -> u128 {
		match self {
			Self::Eip1559 {
				max_fee_per_gas, ..
			} => *max_fee_per_gas,
			Self::Legacy { gas_price } => *gas_price,
		}
	}
}

/// Recent fee history as reported by `eth_feeHistory`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeHistorySample {
	/// Base fee of the block following the newest block in the range.
	pub latest_base_fee: u128,
	/// One reward per block at the requested percentile, oldest first.
	pub rewards: Vec<u128>,
}

/// Unsigned transaction envelope.
///
/// Nonce and chain id are filled fresh for every transaction.
/// `gas_limit` stays `None` until the node's estimate (plus margin) is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	pub chain_id: u64,
	pub nonce: u64,
	pub from: Address,
	pub to: Address,
	pub value: U256,
	pub data: Bytes,
	pub gas_limit: Option<u64>,
	pub fee: FeeQuote,
}

impl Transaction {
	/// Replaces the target and calldata, keeping the prepared envelope fields.
	pub fn with_call(mut self, to: Address, data: impl Into<Bytes>) -> Self {
		self.to = to;
		self.data = data.into();
		self
	}
}

impl From<&Transaction> for TransactionRequest {
	fn from(tx: &Transaction) -> Self {
		let request = TransactionRequest::default()
			.from(tx.from)
			.to(tx.to)
			.value(tx.value)
			.input(tx.data.clone().into())
			.nonce(tx.nonce);
		let request = match tx.fee {
			FeeQuote::Eip1559 {
				max_priority_fee_per_gas,
				max_fee_per_gas,
			} => request
				.max_priority_fee_per_gas(max_priority_fee_per_gas)
				.max_fee_per_gas(max_fee_per_gas),
			FeeQuote::Legacy { gas_price } => request.gas_price(gas_price),
		};
		match tx.gas_limit {
			Some(gas) => request.gas_limit(gas),
			None => request,
		}
	}
}

/// Raw signed bytes plus the transaction hash. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
	raw: Bytes,
	hash: TxHash,
}

impl SignedTransaction {
	pub fn new(raw: Bytes, hash: TxHash) -> Self {
		Self { raw, hash }
	}

	pub fn raw(&self) -> &Bytes {
		&self.raw
	}

	pub fn hash(&self) -> TxHash {
		self.hash
	}
}

/// Transaction receipt containing execution details.
///
/// A receipt with `success == false` is a mined-but-reverted transaction,
/// a normal terminal state rather than a delivery fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TxHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_zero_priority_fee_uses_base_fee() {
		let quote = FeeQuote::eip1559(100, 0);
		assert_eq!(
			quote,
			FeeQuote::Eip1559 {
				max_priority_fee_per_gas: 100,
				max_fee_per_gas: 200,
			}
		);
	}

	#[test]
	fn test_max_fee_covers_priority_fee() {
		let quote = FeeQuote::eip1559(30, 8);
		match quote {
			FeeQuote::Eip1559 {
				max_priority_fee_per_gas,
				max_fee_per_gas,
			} => {
				assert_eq!(max_priority_fee_per_gas, 8);
				assert_eq!(max_fee_per_gas, 38);
				assert!(max_fee_per_gas >= max_priority_fee_per_gas);
			}
			FeeQuote::Legacy { .. } => panic!("expected EIP-1559 quote"),
		}
	}

	#[test]
	fn test_request_carries_fee_variant() {
		let tx = Transaction {
			chain_id: 1,
			nonce: 7,
			from: Address::repeat_byte(0x11),
			to: Address::repeat_byte(0x22),
			value: U256::from(5),
			data: Bytes::from(vec![0xde, 0xad]),
			gas_limit: Some(21_000),
			fee: FeeQuote::Legacy { gas_price: 9 },
		};
		let request: TransactionRequest = (&tx).into();
		assert_eq!(request.gas_price, Some(9));
		assert_eq!(request.max_fee_per_gas, None);
		assert_eq!(request.nonce, Some(7));
		assert_eq!(request.gas, Some(21_000));
	}
}
