//! Account management module for the DEX executor.
//!
//! An account holds exactly one signing credential in memory and derives the
//! matching chain address from it. Loading and storing keys is left to the
//! caller; this crate only signs.

use async_trait::async_trait;
use dex_types::{Address, SignedTransaction, Transaction};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// Trait defining the interface for account implementations.
///
/// Implementations own the credential; callers only ever see the derived
/// address and the signed payloads.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Address derived from the signing credential.
	fn address(&self) -> Address;

	/// Signs a fully prepared transaction and returns its raw 2718 encoding.
	///
	/// Fails when the envelope is incomplete (no gas limit) or was prepared
	/// for a different sender.
	async fn sign_transaction(&self, tx: &Transaction) -> Result<SignedTransaction, AccountError>;
}

/// Service that manages account operations.
///
/// This struct wraps an underlying account implementation and is shared
/// (behind an `Arc`) by every component acting for the same wallet.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Address of the managed account.
	pub fn address(&self) -> Address {
		self.implementation.address()
	}

	/// Signs a transaction using the managed account.
	pub async fn sign(&self, tx: &Transaction) -> Result<SignedTransaction, AccountError> {
		if tx.from != self.address() {
			return Err(AccountError::SigningFailed(format!(
				"transaction sender {} does not match account {}",
				tx.from,
				self.address()
			)));
		}
		self.implementation.sign_transaction(tx).await
	}
}
