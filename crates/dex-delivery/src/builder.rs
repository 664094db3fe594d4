//! Transaction lifecycle for a single account.
//!
//! A [`TransactionBuilder`] prepares the envelope (fresh chain id and nonce,
//! fee fields), estimates gas, signs with the account, submits and then polls
//! for the receipt. The whole sequence runs under a per-account lock so two
//! workflows of the same wallet never race for a nonce.

use crate::{ChainClient, DeliveryError, FeeConfig, FeeEstimator};
use dex_account::AccountService;
use dex_types::{
	explorer_link, truncate_id, Address, Bytes, Transaction, TransactionReceipt, TxHash, U256,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Percentage added on top of the node's gas estimate.
pub const GAS_MARGIN_PERCENT: u64 = 10;

/// Confirmation parameters.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
	/// Deadline for a submitted transaction to be mined.
	pub receipt_timeout: Duration,
	/// Delay between receipt queries.
	pub poll_interval: Duration,
	/// Block explorer transaction URL prefix used in log lines.
	pub explorer_url: Option<String>,
}

impl Default for BuilderConfig {
	fn default() -> Self {
		Self {
			receipt_timeout: Duration::from_secs(300),
			poll_interval: Duration::from_secs(2),
			explorer_url: None,
		}
	}
}

/// A state-changing contract call to be sent by [`TransactionBuilder::execute`].
#[derive(Debug, Clone)]
pub struct ContractCall {
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
	/// Apply the configured gas margin to the estimate.
	pub gas_margin: bool,
}

impl ContractCall {
	pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			to,
			data: data.into(),
			value: U256::ZERO,
			gas_margin: true,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	/// Uses the node's estimate unchanged.
	pub fn without_gas_margin(mut self) -> Self {
		self.gas_margin = false;
		self
	}
}

/// Builds, signs, submits and confirms transactions for one account.
pub struct TransactionBuilder {
	client: Arc<dyn ChainClient>,
	account: Arc<AccountService>,
	fees: FeeEstimator,
	config: BuilderConfig,
	in_flight: Mutex<()>,
}

impl TransactionBuilder {
	pub fn new(
		client: Arc<dyn ChainClient>,
		account: Arc<AccountService>,
		fee_config: FeeConfig,
		config: BuilderConfig,
	) -> Self {
		let fees = FeeEstimator::new(client.clone(), fee_config);
		Self {
			client,
			account,
			fees,
			config,
			in_flight: Mutex::new(()),
		}
	}

	/// Address of the sending account.
	pub fn address(&self) -> Address {
		self.account.address()
	}

	pub fn client(&self) -> &Arc<dyn ChainClient> {
		&self.client
	}

	/// Envelope with fresh chain id, nonce and fee fields, carrying `value`.
	///
	/// Target and calldata are left empty; see [`Transaction::with_call`].
	pub async fn prepare(&self, value: U256) -> Result<Transaction, DeliveryError> {
		let from = self.account.address();
		let chain_id = self.client.chain_id().await?;
		let nonce = self.client.transaction_count(from).await?;
		let fee = self.fees.estimate().await?;

		Ok(Transaction {
			chain_id,
			nonce,
			from,
			to: Address::ZERO,
			value,
			data: Bytes::new(),
			gas_limit: None,
			fee,
		})
	}

	/// Node gas estimate for `tx`, inflated by [`GAS_MARGIN_PERCENT`] when
	/// `with_margin` is set.
	pub async fn estimate_gas(
		&self,
		tx: &Transaction,
		with_margin: bool,
	) -> Result<u64, DeliveryError> {
		let estimate = self.client.estimate_gas(tx).await?;
		if !with_margin {
			return Ok(estimate);
		}
		let margin = 100 + GAS_MARGIN_PERCENT;
		Ok(estimate.saturating_mul(margin) / 100)
	}

	/// Signs `tx` with the account and broadcasts it.
	pub async fn sign_and_send(&self, tx: &Transaction) -> Result<TxHash, DeliveryError> {
		let signed = self.account.sign(tx).await?;
		let hash = self.client.send_raw_transaction(signed.raw()).await?;
		tracing::info!(
			tx_hash = %truncate_id(&hash.to_string()),
			nonce = tx.nonce,
			"Submitted transaction"
		);
		Ok(hash)
	}

	/// Polls for the receipt of `hash` until it is mined or the receipt
	/// timeout elapses.
	///
	/// A reverted transaction is returned as a receipt with `success == false`.
	/// Query errors while polling are logged and polling continues.
	pub async fn wait_for_receipt(&self, hash: TxHash) -> Result<TransactionReceipt, DeliveryError> {
		let start_time = tokio::time::Instant::now();

		loop {
			match self.client.transaction_receipt(hash).await {
				Ok(Some(receipt)) => return Ok(receipt),
				Ok(None) => {}
				Err(e) => {
					tracing::warn!(tx_hash = %truncate_id(&hash.to_string()), error = %e, "Receipt query failed");
				},
			}

			if start_time.elapsed() >= self.config.receipt_timeout {
				return Err(DeliveryError::Timeout {
					hash,
					seconds: self.config.receipt_timeout.as_secs(),
				});
			}

			tokio::time::sleep(self.config.poll_interval).await;
		}
	}

	/// Runs a contract call through the full lifecycle and returns its receipt.
	///
	/// Holds the account lock from nonce fetch until the receipt is observed.
	pub async fn execute(&self, call: ContractCall) -> Result<TransactionReceipt, DeliveryError> {
		let _guard = self.in_flight.lock().await;

		let mut tx = self
			.prepare(call.value)
			.await?
			.with_call(call.to, call.data);
		let gas_limit = self.estimate_gas(&tx, call.gas_margin).await?;
		tx.gas_limit = Some(gas_limit);

		let hash = self.sign_and_send(&tx).await?;
		let receipt = self.wait_for_receipt(hash).await?;
		self.log_outcome(&receipt);
		Ok(receipt)
	}

	fn link(&self, hash: TxHash) -> String {
		match &self.config.explorer_url {
			Some(base) => explorer_link(base, &hash.to_string()),
			None => hash.to_string(),
		}
	}

	fn log_outcome(&self, receipt: &TransactionReceipt) {
		if receipt.success {
			tracing::info!(
				block = receipt.block_number,
				"Transaction was successful: {}",
				self.link(receipt.hash)
			);
		} else {
			tracing::error!(
				block = receipt.block_number,
				"Transaction reverted: {}",
				self.link(receipt.hash)
			);
		}
	}
}
