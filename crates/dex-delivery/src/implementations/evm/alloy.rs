//! JSON-RPC chain client built on Alloy.
//!
//! Wraps a `RootProvider` over an HTTP transport. Each wallet may route its
//! traffic through its own proxy, so the underlying `reqwest::Client` is
//! supplied by the caller rather than created here.

use crate::{ChainClient, DeliveryError};
use alloy::eips::BlockNumberOrTag;
use alloy::network::ReceiptResponse;
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::Http;
use alloy::transports::TransportError;
use async_trait::async_trait;
use dex_types::{
	Address, Bytes, FeeHistorySample, Transaction, TransactionReceipt, TxHash, U256,
};

/// Alloy-based chain client for a single RPC endpoint.
pub struct AlloyChainClient {
	provider: RootProvider,
}

impl AlloyChainClient {
	/// Creates a client for `rpc_url` that sends requests through `http`.
	pub fn new(rpc_url: &str, http: reqwest::Client) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::InvalidInput(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

		let transport = Http::with_client(http, url);
		let is_local = transport.guess_local();
		let provider = RootProvider::new(RpcClient::new(transport, is_local));

		Ok(Self { provider })
	}
}

/// Builds the HTTP client used by one or more chain clients.
///
/// `proxy` accepts `host:port`, `user:pass@host:port` or a full URL; a bare
/// address is treated as an HTTP proxy.
pub fn build_http_client(proxy: Option<&str>) -> Result<reqwest::Client, DeliveryError> {
	let mut builder = reqwest::Client::builder();
	if let Some(proxy) = proxy {
		let proxy_url = if proxy.contains("://") {
			proxy.to_string()
		} else {
			format!("http://{}", proxy)
		};
		let proxy = reqwest::Proxy::all(&proxy_url)
			.map_err(|e| DeliveryError::InvalidInput(format!("Invalid proxy: {}", e)))?;
		builder = builder.proxy(proxy);
	}
	builder
		.build()
		.map_err(|e| DeliveryError::InvalidInput(format!("Failed to build HTTP client: {}", e)))
}

/// Extracts the node's error message when the failure is a JSON-RPC error
/// response (typically a revert) rather than a transport failure.
fn error_message(err: &TransportError) -> Option<String> {
	err.as_error_resp().map(|payload| payload.message.to_string())
}

fn rpc_error(context: &str, err: TransportError) -> DeliveryError {
	DeliveryError::Rpc(format!("{}: {}", context, err))
}

#[async_trait]
impl ChainClient for AlloyChainClient {
	async fn chain_id(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| rpc_error("Failed to get chain id", e))
	}

	async fn transaction_count(&self, address: Address) -> Result<u64, DeliveryError> {
		self.provider
			.get_transaction_count(address)
			.await
			.map_err(|e| rpc_error("Failed to get nonce", e))
	}

	async fn balance(&self, address: Address) -> Result<U256, DeliveryError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| rpc_error("Failed to get balance", e))
	}

	async fn fee_history(
		&self,
		block_count: u64,
		reward_percentile: f64,
	) -> Result<FeeHistorySample, DeliveryError> {
		let history = self
			.provider
			.get_fee_history(block_count, BlockNumberOrTag::Latest, &[reward_percentile])
			.await
			.map_err(|e| rpc_error("Failed to get fee history", e))?;

		let latest_base_fee = history
			.base_fee_per_gas
			.last()
			.copied()
			.ok_or_else(|| DeliveryError::Rpc("Fee history returned no base fee".to_string()))?;
		let rewards = history
			.reward
			.unwrap_or_default()
			.into_iter()
			.map(|block| block.first().copied().unwrap_or_default())
			.collect();

		Ok(FeeHistorySample {
			latest_base_fee,
			rewards,
		})
	}

	async fn gas_price(&self) -> Result<u128, DeliveryError> {
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| rpc_error("Failed to get gas price", e))
	}

	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError> {
		let request: TransactionRequest = tx.into();
		self.provider
			.estimate_gas(request)
			.await
			.map_err(|e| match error_message(&e) {
				Some(reason) => DeliveryError::GasEstimation(reason),
				None => rpc_error("Failed to estimate gas", e),
			})
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		let request = TransactionRequest::default().to(to).input(data.into());
		self.provider
			.call(request)
			.await
			.map_err(|e| match error_message(&e) {
				Some(reason) => DeliveryError::CallReverted(reason),
				None => rpc_error("Failed to call contract", e),
			})
	}

	async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TxHash, DeliveryError> {
		let pending = self
			.provider
			.send_raw_transaction(raw)
			.await
			.map_err(|e| rpc_error("Failed to send transaction", e))?;
		Ok(*pending.tx_hash())
	}

	async fn transaction_receipt(
		&self,
		hash: TxHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let receipt = self
			.provider
			.get_transaction_receipt(hash)
			.await
			.map_err(|e| rpc_error("Failed to get receipt", e))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: receipt.transaction_hash(),
			block_number: receipt.block_number().unwrap_or(0),
			success: receipt.status(),
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_invalid_rpc_url_rejected() {
		let http = build_http_client(None).unwrap();
		assert!(matches!(
			AlloyChainClient::new("not a url", http),
			Err(DeliveryError::InvalidInput(_))
		));
	}

	#[test]
	fn test_client_with_proxy() {
		assert!(build_http_client(Some("user:pass@127.0.0.1:8080")).is_ok());
		let http = build_http_client(Some("127.0.0.1:8080")).unwrap();
		assert!(AlloyChainClient::new("https://rpc.testnet.xrplevm.org", http).is_ok());
	}
}
