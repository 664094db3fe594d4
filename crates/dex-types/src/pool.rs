//! Pool reserve and quote types.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Reserves of a two-token pool in the pool's canonical token order.
///
/// `token0`/`token1` follow the router's own sort rule, not the order in
/// which a caller named the tokens. Use [`PoolReserves::oriented`] to map a
/// caller's token back onto the right reserves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReserves {
	pub token0: Address,
	pub token1: Address,
	pub reserve0: U256,
	pub reserve1: U256,
	pub decimals0: u8,
	pub decimals1: u8,
	pub stable: bool,
}

/// Reserves seen from one side of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientedReserves {
	pub reserve_in: U256,
	pub reserve_out: U256,
	pub decimals_in: u8,
	pub decimals_out: u8,
}

impl PoolReserves {
	/// Returns the reserves oriented so that `token_in` is the input side.
	///
	/// Returns `None` when `token_in` is not one of the pool's tokens.
	pub fn oriented(&self, token_in: Address) -> Option<OrientedReserves> {
		if token_in == self.token0 {
			Some(OrientedReserves {
				reserve_in: self.reserve0,
				reserve_out: self.reserve1,
				decimals_in: self.decimals0,
				decimals_out: self.decimals1,
			})
		} else if token_in == self.token1 {
			Some(OrientedReserves {
				reserve_in: self.reserve1,
				reserve_out: self.reserve0,
				decimals_in: self.decimals1,
				decimals_out: self.decimals0,
			})
		} else {
			None
		}
	}

	/// True when either side holds no liquidity.
	pub fn is_empty(&self) -> bool {
		self.reserve0.is_zero() || self.reserve1.is_zero()
	}
}

/// Input amount, proportional output (or paired amount) and its slippage floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountQuote {
	pub amount_in: U256,
	pub amount_out_or_paired: U256,
	pub amount_min: U256,
}
