//! Typed contract calls on top of the raw chain client.
//!
//! Reads are ABI-encoded with `SolCall`, dispatched through `eth_call` and
//! decoded into the call's return type. Writes are only encoded here; they are
//! handed to the transaction builder as a [`ContractCall`].

use alloy::sol_types::SolCall;
use dex_delivery::{ChainClient, ContractCall, DeliveryError};
use dex_types::{Address, DecodeError, U256};
use thiserror::Error;

/// Errors from a single typed contract read.
#[derive(Debug, Error)]
pub enum ContractError {
	#[error("Contract call failed: {0}")]
	Delivery(#[from] DeliveryError),
	#[error(transparent)]
	Decode(#[from] DecodeError),
}

/// Calls `target` with `call` and decodes the result.
pub async fn read<C: SolCall>(
	client: &dyn ChainClient,
	target: Address,
	call: &C,
) -> Result<C::Return, ContractError> {
	let data = client.call(target, call.abi_encode().into()).await?;
	C::abi_decode_returns(&data).map_err(|e| {
		ContractError::Decode(DecodeError::Abi {
			function: C::SIGNATURE,
			reason: e.to_string(),
		})
	})
}

/// Encodes `call` as a state-changing transaction to `target`.
pub fn write<C: SolCall>(target: Address, call: &C) -> ContractCall {
	ContractCall::new(target, call.abi_encode())
}

/// Encodes a payable call carrying `value` in native currency.
pub fn write_payable<C: SolCall>(target: Address, call: &C, value: U256) -> ContractCall {
	write(target, call).with_value(value)
}

#[cfg(test)]
mod tests {
	use super::*;
	use dex_delivery::implementations::mock::MockChainClient;
	use dex_types::abi::{IERC20, IRouter};

	#[tokio::test]
	async fn test_read_decodes_return_value() {
		let token = Address::repeat_byte(0x11);
		let owner = Address::repeat_byte(0x22);
		let mock = MockChainClient::new(1);
		mock.on_call::<IERC20::balanceOfCall, _>(token, U256::from(1_500u64));

		let balance = read(&mock, token, &IERC20::balanceOfCall { owner })
			.await
			.unwrap();
		assert_eq!(balance, U256::from(1_500u64));
		assert_eq!(mock.method_log(), vec!["eth_call"]);
	}

	#[tokio::test]
	async fn test_read_multiple_return_values() {
		let router = Address::repeat_byte(0x33);
		let low = Address::repeat_byte(0x01);
		let high = Address::repeat_byte(0x02);
		let mock = MockChainClient::new(1);
		mock.on_call::<IRouter::sortTokensCall, _>(router, (low, high));

		let sorted = read(
			&mock,
			router,
			&IRouter::sortTokensCall {
				tokenA: high,
				tokenB: low,
			},
		)
		.await
		.unwrap();
		assert_eq!(sorted.token0, low);
		assert_eq!(sorted.token1, high);
	}

	#[tokio::test]
	async fn test_revert_reason_exposed() {
		let router = Address::repeat_byte(0x33);
		let mock = MockChainClient::new(1);
		mock.revert_call::<IRouter::getReservesCall>(router, "Pair: Does not exist");

		let err = read(
			&mock,
			router,
			&IRouter::getReservesCall {
				tokenA: Address::repeat_byte(0x01),
				tokenB: Address::repeat_byte(0x02),
				stable: false,
				_factory: Address::ZERO,
			},
		)
		.await
		.unwrap_err();
		assert!(matches!(
			err,
			ContractError::Delivery(ref e) if e.revert_reason() == Some("Pair: Does not exist")
		));
	}

	#[tokio::test]
	async fn test_malformed_return_data() {
		let token = Address::repeat_byte(0x11);
		let mock = MockChainClient::new(1);
		mock.on_call_raw(token, IERC20::decimalsCall::SELECTOR, vec![0x01]);

		let err = read(&mock, token, &IERC20::decimalsCall {}).await.unwrap_err();
		assert!(matches!(err, ContractError::Decode(DecodeError::Abi { .. })));
	}

	#[test]
	fn test_write_encodes_calldata() {
		let token = Address::repeat_byte(0x11);
		let call = write(
			token,
			&IERC20::approveCall {
				spender: Address::repeat_byte(0x44),
				amount: U256::from(10u64),
			},
		);
		assert_eq!(call.to, token);
		assert_eq!(&call.data[..4], &IERC20::approveCall::SELECTOR);
		assert!(call.value.is_zero());

		let payable = write_payable(token, &IERC20::decimalsCall {}, U256::from(7u64));
		assert_eq!(payable.value, U256::from(7u64));
	}
}
