//! Multicall call and result types.
//!
//! A batch is an ordered sequence of [`Call`]s. The aggregate contract answers
//! with one [`CallResult`] per call in the same order, and nothing in the
//! payload identifies which call produced which result: callers correlate
//! results positionally.

use crate::abi::IMulticall3;
use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;
use thiserror::Error;

/// Errors raised when a sub-call's return data cannot be used.
#[derive(Debug, Error)]
pub enum DecodeError {
	/// The sub-call reverted inside the batch.
	#[error("Call to {0} failed")]
	CallFailed(&'static str),
	/// The return data did not match the expected ABI shape.
	#[error("Failed to decode {function}: {reason}")]
	Abi {
		function: &'static str,
		reason: String,
	},
}

/// One element of a multicall batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
	pub target: Address,
	pub allow_failure: bool,
	pub data: Bytes,
}

impl Call {
	/// Encodes `call` against `target`, allowing it to fail without aborting the batch.
	pub fn new<C: SolCall>(target: Address, call: &C) -> Self {
		Self {
			target,
			allow_failure: true,
			data: call.abi_encode().into(),
		}
	}

	/// Marks this call as required; a failure reverts the whole batch.
	pub fn required(mut self) -> Self {
		self.allow_failure = false;
		self
	}
}

impl From<Call> for IMulticall3::Call3 {
	fn from(call: Call) -> Self {
		Self {
			target: call.target,
			allowFailure: call.allow_failure,
			callData: call.data,
		}
	}
}

/// Outcome of one sub-call: a success flag and raw return bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
	pub success: bool,
	pub return_data: Bytes,
}

impl CallResult {
	pub fn ok(return_data: impl Into<Bytes>) -> Self {
		Self {
			success: true,
			return_data: return_data.into(),
		}
	}

	pub fn failed() -> Self {
		Self {
			success: false,
			return_data: Bytes::new(),
		}
	}

	/// Decodes the return data as the output of `C`.
	///
	/// Fails with [`DecodeError::CallFailed`] when the sub-call did not succeed,
	/// so a reverted call is never decoded as if it had returned data.
	pub fn decode<C: SolCall>(&self) -> Result<C::Return, DecodeError> {
		if !self.success {
			return Err(DecodeError::CallFailed(C::SIGNATURE));
		}
		C::abi_decode_returns(&self.return_data).map_err(|e| DecodeError::Abi {
			function: C::SIGNATURE,
			reason: e.to_string(),
		})
	}
}

impl From<IMulticall3::Call3Result> for CallResult {
	fn from(result: IMulticall3::Call3Result) -> Self {
		Self {
			success: result.success,
			return_data: result.returnData,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::abi::IERC20;
	use alloy::primitives::U256;
	use alloy::sol_types::SolValue;

	#[test]
	fn test_call_encodes_selector_and_args() {
		let owner = Address::repeat_byte(0xaa);
		let call = Call::new(
			Address::repeat_byte(0x01),
			&IERC20::balanceOfCall { owner },
		);
		assert!(call.allow_failure);
		assert_eq!(&call.data[..4], &IERC20::balanceOfCall::SELECTOR);
		assert_eq!(&call.data[16..36], owner.as_slice());
		assert!(!call.required().allow_failure);
	}

	#[test]
	fn test_decode_success() {
		let result = CallResult::ok(U256::from(42u64).abi_encode());
		let balance = result.decode::<IERC20::balanceOfCall>().unwrap();
		assert_eq!(balance, U256::from(42u64));
	}

	#[test]
	fn test_decode_failed_call() {
		let result = CallResult::failed();
		assert!(matches!(
			result.decode::<IERC20::decimalsCall>(),
			Err(DecodeError::CallFailed(_))
		));
	}

	#[test]
	fn test_decode_malformed_data() {
		let result = CallResult::ok(vec![0x01, 0x02]);
		assert!(matches!(
			result.decode::<IERC20::balanceOfCall>(),
			Err(DecodeError::Abi { .. })
		));
	}
}
