//! Scripted in-memory chain client for tests.
//!
//! Contract calls are answered from a table keyed by target address and
//! 4-byte selector. `aggregate3` calls against the configured multicall
//! address are unpacked and answered from the same table, so batching code
//! is exercised end to end. Submitted transactions are decoded and kept for
//! inspection, and every RPC method invoked is appended to a log. A mined
//! ERC20 `approve` updates the scripted `allowance` of that token.
//!
//! The mock tracks a single pending nonce and is meant to serve one sender.

use crate::{ChainClient, DeliveryError};
use alloy::consensus::{Transaction as _, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use dex_types::abi::{IMulticall3, IERC20};
use dex_types::{
	Address, Bytes, FeeHistorySample, Transaction, TransactionReceipt, TxHash, U256,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// How the mock answers receipt queries for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptMode {
	/// Mined with status 1.
	Success,
	/// Mined with status 0.
	Revert,
	/// Never mined; receipt queries keep returning `None`.
	Pending,
}

#[derive(Debug, Clone)]
enum CallResponse {
	Return(Bytes),
	Revert(String),
}

/// A transaction accepted by [`MockChainClient::send_raw_transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransaction {
	pub hash: TxHash,
	pub nonce: u64,
	pub to: Option<Address>,
	pub value: U256,
	pub input: Bytes,
	pub gas_limit: u64,
}

impl SubmittedTransaction {
	/// First four bytes of the calldata.
	pub fn selector(&self) -> Option<[u8; 4]> {
		self.input.get(..4).and_then(|s| s.try_into().ok())
	}
}

struct MockState {
	chain_id: u64,
	nonce: u64,
	balances: HashMap<Address, U256>,
	fee_history: FeeHistorySample,
	gas_price: u128,
	gas_estimate: Result<u64, String>,
	responses: HashMap<(Address, [u8; 4]), CallResponse>,
	multicall: Option<Address>,
	reverse_multicall: bool,
	track_approvals: bool,
	default_receipt: ReceiptMode,
	queued_receipts: VecDeque<ReceiptMode>,
	receipts: HashMap<TxHash, Option<TransactionReceipt>>,
	submitted: Vec<SubmittedTransaction>,
	method_log: Vec<&'static str>,
	block_number: u64,
}

/// Scripted [`ChainClient`] implementation.
pub struct MockChainClient {
	state: Mutex<MockState>,
}

impl MockChainClient {
	pub fn new(chain_id: u64) -> Self {
		Self {
			state: Mutex::new(MockState {
				chain_id,
				nonce: 0,
				balances: HashMap::new(),
				fee_history: FeeHistorySample {
					latest_base_fee: 1_000_000_000,
					rewards: vec![100_000_000; 5],
				},
				gas_price: 1_000_000_000,
				gas_estimate: Ok(100_000),
				responses: HashMap::new(),
				multicall: None,
				reverse_multicall: false,
				track_approvals: true,
				default_receipt: ReceiptMode::Success,
				queued_receipts: VecDeque::new(),
				receipts: HashMap::new(),
				submitted: Vec::new(),
				method_log: Vec::new(),
				block_number: 100,
			}),
		}
	}

	fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
		let mut state = self.state.lock().unwrap();
		f(&mut state)
	}

	pub fn set_nonce(&self, nonce: u64) {
		self.with_state(|s| s.nonce = nonce);
	}

	pub fn set_balance(&self, address: Address, balance: U256) {
		self.with_state(|s| {
			s.balances.insert(address, balance);
		});
	}

	pub fn set_fee_history(&self, history: FeeHistorySample) {
		self.with_state(|s| s.fee_history = history);
	}

	pub fn set_gas_price(&self, gas_price: u128) {
		self.with_state(|s| s.gas_price = gas_price);
	}

	pub fn set_gas_estimate(&self, gas: u64) {
		self.with_state(|s| s.gas_estimate = Ok(gas));
	}

	/// Makes every gas estimation fail as a would-be revert with `reason`.
	pub fn fail_gas_estimate(&self, reason: &str) {
		self.with_state(|s| s.gas_estimate = Err(reason.to_string()));
	}

	/// Answers calls of `C` against `target` with the ABI encoding of `value`.
	pub fn on_call<C: SolCall, V: SolValue>(&self, target: Address, value: V) {
		self.on_call_raw(target, C::SELECTOR, value.abi_encode());
	}

	/// Answers calls with `selector` against `target` with raw return data.
	pub fn on_call_raw(&self, target: Address, selector: [u8; 4], data: impl Into<Bytes>) {
		self.with_state(|s| {
			s.responses
				.insert((target, selector), CallResponse::Return(data.into()));
		});
	}

	/// Makes calls of `C` against `target` revert with `reason`.
	pub fn revert_call<C: SolCall>(&self, target: Address, reason: &str) {
		self.with_state(|s| {
			s.responses.insert(
				(target, C::SELECTOR),
				CallResponse::Revert(reason.to_string()),
			);
		});
	}

	/// Serves `aggregate3` at `address`.
	pub fn with_multicall(self, address: Address) -> Self {
		self.with_state(|s| s.multicall = Some(address));
		self
	}

	/// Returns multicall results in reverse order, as a misbehaving node would.
	pub fn reverse_multicall_results(&self) {
		self.with_state(|s| s.reverse_multicall = true);
	}

	/// Leaves scripted allowances unchanged when an approval is mined.
	pub fn ignore_approvals(&self) {
		self.with_state(|s| s.track_approvals = false);
	}

	/// Receipt mode applied to transactions with no queued mode.
	pub fn set_receipt_mode(&self, mode: ReceiptMode) {
		self.with_state(|s| s.default_receipt = mode);
	}

	/// Receipt modes consumed one per submitted transaction, in order.
	pub fn queue_receipt_modes(&self, modes: impl IntoIterator<Item = ReceiptMode>) {
		self.with_state(|s| s.queued_receipts.extend(modes));
	}

	pub fn submitted(&self) -> Vec<SubmittedTransaction> {
		self.with_state(|s| s.submitted.clone())
	}

	pub fn method_log(&self) -> Vec<&'static str> {
		self.with_state(|s| s.method_log.clone())
	}

	/// Number of times `method` was invoked.
	pub fn count(&self, method: &str) -> usize {
		self.with_state(|s| s.method_log.iter().filter(|m| **m == method).count())
	}

	fn log(&self, method: &'static str) {
		self.with_state(|s| s.method_log.push(method));
	}

	fn answer(state: &MockState, to: Address, data: &[u8]) -> Result<Bytes, DeliveryError> {
		let selector: [u8; 4] = data
			.get(..4)
			.and_then(|s| s.try_into().ok())
			.ok_or_else(|| DeliveryError::CallReverted("missing selector".to_string()))?;

		if state.multicall == Some(to) && selector == IMulticall3::aggregate3Call::SELECTOR {
			return Self::answer_aggregate(state, data);
		}

		match state.responses.get(&(to, selector)) {
			Some(CallResponse::Return(bytes)) => Ok(bytes.clone()),
			Some(CallResponse::Revert(reason)) => Err(DeliveryError::CallReverted(reason.clone())),
			None => Err(DeliveryError::CallReverted(format!(
				"no response scripted for {} selector 0x{}",
				to,
				alloy::hex::encode(selector)
			))),
		}
	}

	fn answer_aggregate(state: &MockState, data: &[u8]) -> Result<Bytes, DeliveryError> {
		let decoded = IMulticall3::aggregate3Call::abi_decode(data)
			.map_err(|e| DeliveryError::CallReverted(e.to_string()))?;

		let mut results = Vec::with_capacity(decoded.calls.len());
		for call in decoded.calls {
			match Self::answer(state, call.target, &call.callData) {
				Ok(return_data) => results.push(IMulticall3::Call3Result {
					success: true,
					returnData: return_data,
				}),
				Err(_) if call.allowFailure => results.push(IMulticall3::Call3Result {
					success: false,
					returnData: Bytes::new(),
				}),
				Err(_) => {
					return Err(DeliveryError::CallReverted(
						"Multicall3: call failed".to_string(),
					))
				}
			}
		}
		if state.reverse_multicall {
			results.reverse();
		}
		Ok(results.abi_encode().into())
	}
}

#[async_trait]
impl ChainClient for MockChainClient {
	async fn chain_id(&self) -> Result<u64, DeliveryError> {
		self.log("eth_chainId");
		Ok(self.with_state(|s| s.chain_id))
	}

	async fn transaction_count(&self, _address: Address) -> Result<u64, DeliveryError> {
		self.log("eth_getTransactionCount");
		Ok(self.with_state(|s| s.nonce))
	}

	async fn balance(&self, address: Address) -> Result<U256, DeliveryError> {
		self.log("eth_getBalance");
		Ok(self.with_state(|s| s.balances.get(&address).copied().unwrap_or_default()))
	}

	async fn fee_history(
		&self,
		_block_count: u64,
		_reward_percentile: f64,
	) -> Result<FeeHistorySample, DeliveryError> {
		self.log("eth_feeHistory");
		Ok(self.with_state(|s| s.fee_history.clone()))
	}

	async fn gas_price(&self) -> Result<u128, DeliveryError> {
		self.log("eth_gasPrice");
		Ok(self.with_state(|s| s.gas_price))
	}

	async fn estimate_gas(&self, _tx: &Transaction) -> Result<u64, DeliveryError> {
		self.log("eth_estimateGas");
		self.with_state(|s| s.gas_estimate.clone())
			.map_err(DeliveryError::GasEstimation)
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		self.log("eth_call");
		self.with_state(|s| Self::answer(s, to, &data))
	}

	async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TxHash, DeliveryError> {
		self.log("eth_sendRawTransaction");
		let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
			.map_err(|e| DeliveryError::InvalidInput(e.to_string()))?;
		let hash = *envelope.tx_hash();

		self.with_state(|s| {
			if envelope.nonce() != s.nonce {
				return Err(DeliveryError::Rpc(format!(
					"nonce too low: expected {}, got {}",
					s.nonce,
					envelope.nonce()
				)));
			}
			s.nonce += 1;
			s.block_number += 1;

			let mode = s.queued_receipts.pop_front().unwrap_or(s.default_receipt);
			let receipt = match mode {
				ReceiptMode::Pending => None,
				ReceiptMode::Success | ReceiptMode::Revert => Some(TransactionReceipt {
					hash,
					block_number: s.block_number,
					success: mode == ReceiptMode::Success,
				}),
			};
			if mode == ReceiptMode::Success && s.track_approvals {
				if let (Some(token), Ok(approve)) = (
					envelope.to(),
					IERC20::approveCall::abi_decode(envelope.input()),
				) {
					s.responses.insert(
						(token, IERC20::allowanceCall::SELECTOR),
						CallResponse::Return(approve.amount.abi_encode().into()),
					);
				}
			}
			s.receipts.insert(hash, receipt);
			s.submitted.push(SubmittedTransaction {
				hash,
				nonce: envelope.nonce(),
				to: envelope.to(),
				value: envelope.value(),
				input: envelope.input().clone(),
				gas_limit: envelope.gas_limit(),
			});
			Ok(hash)
		})
	}

	async fn transaction_receipt(
		&self,
		hash: TxHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.log("eth_getTransactionReceipt");
		Ok(self.with_state(|s| s.receipts.get(&hash).cloned().flatten()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dex_types::MULTICALL3_ADDRESS;

	#[tokio::test]
	async fn test_scripted_call_and_missing_call() {
		let token = Address::repeat_byte(0x11);
		let mock = MockChainClient::new(1);
		mock.on_call::<IERC20::decimalsCall, _>(token, 6u16);

		let data: Bytes = IERC20::decimalsCall {}.abi_encode().into();
		let ret = mock.call(token, data.clone()).await.unwrap();
		assert_eq!(IERC20::decimalsCall::abi_decode_returns(&ret).unwrap(), 6);

		let other = Address::repeat_byte(0x22);
		assert!(matches!(
			mock.call(other, data).await,
			Err(DeliveryError::CallReverted(_))
		));
	}

	#[tokio::test]
	async fn test_aggregate_allows_failures() {
		let token = Address::repeat_byte(0x11);
		let mock = MockChainClient::new(1).with_multicall(MULTICALL3_ADDRESS);
		mock.on_call::<IERC20::decimalsCall, _>(token, 6u16);

		let calls = vec![
			IMulticall3::Call3 {
				target: token,
				allowFailure: true,
				callData: IERC20::decimalsCall {}.abi_encode().into(),
			},
			IMulticall3::Call3 {
				target: token,
				allowFailure: true,
				callData: IERC20::nameCall {}.abi_encode().into(),
			},
		];
		let data = IMulticall3::aggregate3Call { calls }.abi_encode();
		let ret = mock.call(MULTICALL3_ADDRESS, data.into()).await.unwrap();
		let results = IMulticall3::aggregate3Call::abi_decode_returns(&ret).unwrap();
		assert_eq!(results.len(), 2);
		assert!(results[0].success);
		assert!(!results[1].success);
	}
}
