//! Operation-level errors and outcomes.

use crate::balance::BalanceError;
use crate::quote::QuoteError;
use dex_delivery::DeliveryError;
use dex_types::{Address, TokenRegistryError, TransactionReceipt, TxHash, U256};
use thiserror::Error;

/// Errors that end a swap or liquidity operation before it produces an
/// outcome.
#[derive(Debug, Error)]
pub enum OperationError {
	/// Balance is zero or cannot cover the computed amount. Nothing was sent.
	#[error("Insufficient {token} balance ({available})")]
	InsufficientBalance { token: String, available: U256 },

	/// The approval was mined but the allowance still does not cover the
	/// amount.
	#[error("Allowance of {token} is {available} after approving {required}")]
	InsufficientAllowanceCoverage {
		token: Address,
		required: U256,
		available: U256,
	},

	/// Zero reserves, missing pool or failed router quote. Nothing was sent.
	#[error("No quote: {0}")]
	NoQuote(#[from] QuoteError),

	/// The approval transaction failed, reverted or timed out.
	#[error("Approval of {token} failed: {reason}")]
	FatalApproval { token: Address, reason: String },

	#[error("Unknown token: {0}")]
	UnknownToken(#[from] TokenRegistryError),

	#[error("Balance lookup failed: {0}")]
	Balance(#[from] BalanceError),

	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
}

impl OperationError {
	/// Pre-flight failures: the operation is skipped and no transaction was
	/// built.
	pub fn is_skip(&self) -> bool {
		matches!(
			self,
			OperationError::InsufficientBalance { .. } | OperationError::NoQuote(_)
		)
	}

	/// Failures after which no further operation of the wallet should run.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			OperationError::FatalApproval { .. }
				| OperationError::InsufficientAllowanceCoverage { .. }
		)
	}
}

/// Terminal state of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
	/// Mined with success status.
	Confirmed(TransactionReceipt),
	/// Mined but reverted.
	Reverted(TransactionReceipt),
	/// Submitted but not mined before the receipt timeout; the result is
	/// unknown.
	TimedOut(TxHash),
	/// Stopped before anything was submitted.
	Skipped(String),
}

impl OperationOutcome {
	pub fn is_confirmed(&self) -> bool {
		matches!(self, OperationOutcome::Confirmed(_))
	}

	/// Hash of the submitted transaction, if one was sent.
	pub fn tx_hash(&self) -> Option<TxHash> {
		match self {
			OperationOutcome::Confirmed(receipt) | OperationOutcome::Reverted(receipt) => {
				Some(receipt.hash)
			},
			OperationOutcome::TimedOut(hash) => Some(*hash),
			OperationOutcome::Skipped(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_classes() {
		let skip = OperationError::InsufficientBalance {
			token: "RISE".to_string(),
			available: U256::ZERO,
		};
		assert!(skip.is_skip());
		assert!(!skip.is_fatal());

		let no_quote = OperationError::from(QuoteError::TokenNotInPool(Address::ZERO));
		assert!(no_quote.is_skip());

		let fatal = OperationError::FatalApproval {
			token: Address::ZERO,
			reason: "reverted".to_string(),
		};
		assert!(fatal.is_fatal());
		assert!(!fatal.is_skip());

		let rpc = OperationError::from(DeliveryError::Rpc("connection refused".to_string()));
		assert!(!rpc.is_skip());
		assert!(!rpc.is_fatal());
	}

	#[test]
	fn test_outcome_hash() {
		let hash = TxHash::repeat_byte(0x01);
		let receipt = TransactionReceipt {
			hash,
			block_number: 5,
			success: false,
		};
		assert_eq!(OperationOutcome::Reverted(receipt).tx_hash(), Some(hash));
		assert_eq!(OperationOutcome::TimedOut(hash).tx_hash(), Some(hash));
		assert_eq!(OperationOutcome::Skipped("zero balance".to_string()).tx_hash(), None);
		assert!(!OperationOutcome::TimedOut(hash).is_confirmed());
	}
}
