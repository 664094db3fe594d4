//! Batched reads through Multicall3.
//!
//! Many independent read calls are folded into a single `aggregate3` call.
//! Results come back in call order and carry no identifier, so every decoder
//! in this module walks them positionally against the layout it submitted.

use crate::contracts::{self, ContractError};
use dex_delivery::ChainClient;
use dex_types::abi::{IMulticall3, IRouter, IERC20};
use dex_types::{Address, Call, CallResult, TokenBalance, U256};
use std::sync::Arc;
use thiserror::Error;

/// Name reported for a token whose `name()` call failed.
pub const UNKNOWN_TOKEN_NAME: &str = "Unknown";
/// Decimals assumed for a token whose `decimals()` call failed.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum MulticallError {
	#[error("Aggregate call failed: {0}")]
	Contract(#[from] ContractError),
	#[error("Multicall returned {actual} results for {expected} calls")]
	LengthMismatch { expected: usize, actual: usize },
}

/// Dispatches `aggregate3` batches against one Multicall3 deployment.
#[derive(Clone)]
pub struct MulticallBatcher {
	client: Arc<dyn ChainClient>,
	address: Address,
}

impl MulticallBatcher {
	pub fn new(client: Arc<dyn ChainClient>, address: Address) -> Self {
		Self { client, address }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	/// Executes `calls` as one `aggregate3` call.
	///
	/// The returned results are in the same order as `calls`. A call with
	/// `allow_failure` set yields a failed [`CallResult`] instead of aborting
	/// the batch; callers must check `success` before decoding.
	pub async fn batch(&self, calls: Vec<Call>) -> Result<Vec<CallResult>, MulticallError> {
		if calls.is_empty() {
			return Ok(Vec::new());
		}

		let expected = calls.len();
		let request = IMulticall3::aggregate3Call {
			calls: calls.into_iter().map(Into::into).collect(),
		};
		let results = contracts::read(self.client.as_ref(), self.address, &request).await?;

		if results.len() != expected {
			return Err(MulticallError::LengthMismatch {
				expected,
				actual: results.len(),
			});
		}

		tracing::debug!(calls = expected, "Multicall batch completed");
		Ok(results.into_iter().map(CallResult::from).collect())
	}

	/// Name, decimals and balance of `owner` for each token, in one batch.
	///
	/// Failed sub-calls fall back to `"Unknown"`, 18 decimals and a zero
	/// balance, each logged as a warning.
	pub async fn token_balances(
		&self,
		owner: Address,
		tokens: &[Address],
	) -> Result<Vec<TokenBalance>, MulticallError> {
		let mut calls = Vec::with_capacity(tokens.len() * 3);
		for token in tokens {
			calls.push(Call::new(*token, &IERC20::nameCall {}));
			calls.push(Call::new(*token, &IERC20::decimalsCall {}));
			calls.push(Call::new(*token, &IERC20::balanceOfCall { owner }));
		}

		let results = self.batch(calls).await?;
		Ok(tokens
			.iter()
			.zip(results.chunks_exact(3))
			.map(|(token, triple)| decode_token_balance(*token, triple))
			.collect())
	}

	/// Router `getAmountsOut` for each `(amount, route)` pair, in one batch.
	///
	/// Each entry is the final amount of the route, or `None` when the router
	/// could not quote it.
	pub async fn amounts_out(
		&self,
		router: Address,
		requests: &[(U256, IRouter::Route)],
	) -> Result<Vec<Option<U256>>, MulticallError> {
		let calls = requests
			.iter()
			.map(|(amount, route)| {
				Call::new(
					router,
					&IRouter::getAmountsOutCall {
						amountIn: *amount,
						routes: vec![route.clone()],
					},
				)
			})
			.collect();

		let results = self.batch(calls).await?;
		Ok(results
			.iter()
			.map(|result| match result.decode::<IRouter::getAmountsOutCall>() {
				Ok(amounts) => amounts.last().copied(),
				Err(e) => {
					tracing::warn!(error = %e, "No router quote");
					None
				},
			})
			.collect())
	}
}

fn decode_token_balance(token: Address, triple: &[CallResult]) -> TokenBalance {
	let name = triple[0]
		.decode::<IERC20::nameCall>()
		.unwrap_or_else(|e| {
			tracing::warn!(%token, error = %e, "Using default token name");
			UNKNOWN_TOKEN_NAME.to_string()
		});
	let decimals = triple[1]
		.decode::<IERC20::decimalsCall>()
		.unwrap_or_else(|e| {
			tracing::warn!(%token, error = %e, "Using default decimals");
			DEFAULT_DECIMALS
		});
	let amount = triple[2]
		.decode::<IERC20::balanceOfCall>()
		.unwrap_or_else(|e| {
			tracing::warn!(%token, error = %e, "Using zero balance");
			U256::ZERO
		});

	TokenBalance {
		token,
		name,
		decimals,
		amount,
	}
}
