//! Local private-key account implementation.
//!
//! Parses a hex private key into an alloy `PrivateKeySigner` and signs
//! EIP-1559 or legacy transactions synchronously in memory.

use crate::{AccountError, AccountInterface};
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::TxKind;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use dex_types::{Address, FeeQuote, SecretString, SignedTransaction, Transaction};

/// Account backed by a private key held in memory.
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Parses a hex private key, with or without `0x` prefix.
	pub fn from_key(key: &SecretString) -> Result<Self, AccountError> {
		let signer = key.with_exposed(|k| {
			k.parse::<PrivateKeySigner>()
				.map_err(|e| AccountError::InvalidKey(e.to_string()))
		})?;
		Ok(Self { signer })
	}

	fn sign_envelope(&self, tx: &Transaction) -> Result<TxEnvelope, AccountError> {
		let gas_limit = tx
			.gas_limit
			.ok_or_else(|| AccountError::SigningFailed("gas limit not set".to_string()))?;

		match tx.fee {
			FeeQuote::Eip1559 {
				max_priority_fee_per_gas,
				max_fee_per_gas,
			} => {
				let mut inner = TxEip1559 {
					chain_id: tx.chain_id,
					nonce: tx.nonce,
					gas_limit,
					max_fee_per_gas,
					max_priority_fee_per_gas,
					to: TxKind::Call(tx.to),
					value: tx.value,
					access_list: Default::default(),
					input: tx.data.clone(),
				};
				let signature = self
					.signer
					.sign_transaction_sync(&mut inner)
					.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
				Ok(TxEnvelope::from(inner.into_signed(signature)))
			}
			FeeQuote::Legacy { gas_price } => {
				let mut inner = TxLegacy {
					chain_id: Some(tx.chain_id),
					nonce: tx.nonce,
					gas_price,
					gas_limit,
					to: TxKind::Call(tx.to),
					value: tx.value,
					input: tx.data.clone(),
				};
				let signature = self
					.signer
					.sign_transaction_sync(&mut inner)
					.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
				Ok(TxEnvelope::from(inner.into_signed(signature)))
			}
		}
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn address(&self) -> Address {
		self.signer.address()
	}

	async fn sign_transaction(&self, tx: &Transaction) -> Result<SignedTransaction, AccountError> {
		let envelope = self.sign_envelope(tx)?;
		let hash = *envelope.tx_hash();
		tracing::debug!(nonce = tx.nonce, tx_hash = %hash, "Signed transaction");
		Ok(SignedTransaction::new(envelope.encoded_2718().into(), hash))
	}
}

/// Factory function to create a local account from a private key.
pub fn create_account(key: &SecretString) -> Result<Box<dyn AccountInterface>, AccountError> {
	Ok(Box::new(LocalWallet::from_key(key)?))
}
