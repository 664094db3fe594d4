//! Quote engine for swaps and liquidity additions.
//!
//! The arithmetic is kept in free functions so it can be reasoned about (and
//! tested) without a chain. [`QuoteEngine`] wraps it with the router and pool
//! reads it needs: factory resolution, canonical token ordering, reserves and
//! `getAmountsOut`.
//!
//! # Amount rules
//!
//! - Proportional quotes floor `amount_in * reserve_out / reserve_in` and give
//!   no quote at all when either reserve is zero.
//! - Slippage and percentages are integer basis points (1/10000).
//! - Amounts taken from a wallet balance are reduced to their two most
//!   significant decimal digits before use, so transaction sizes are round
//!   and never reveal the exact balance.
//! - The first leg of a liquidity addition is capped by what the whole
//!   balance of the second leg can pair with at the current pool ratio.

use crate::contracts::{self, ContractError};
use crate::multicall::{MulticallBatcher, MulticallError, DEFAULT_DECIMALS};
use dex_delivery::ChainClient;
use dex_types::abi::{IRouter, IERC20};
use dex_types::{
	Address, AmountQuote, Call, OrientedReserves, PoolReserves, TokenBalance, U256,
};
use std::sync::Arc;
use thiserror::Error;

/// Basis points in one whole.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Errors that leave an operation without a usable quote.
#[derive(Debug, Error)]
pub enum QuoteError {
	#[error("No liquidity in pool {token_a}/{token_b}")]
	NoLiquidity { token_a: Address, token_b: Address },
	#[error("Router returned no amount for {from} -> {to}")]
	EmptyQuote { from: Address, to: Address },
	#[error("Token {0} is not part of the pool")]
	TokenNotInPool(Address),
	#[error("Quote read failed: {0}")]
	Contract(#[from] ContractError),
	#[error(transparent)]
	Multicall(#[from] MulticallError),
}

/// Desired and minimum amounts for both legs of a liquidity addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityQuote {
	pub amount_a_desired: U256,
	pub amount_b_desired: U256,
	pub amount_a_min: U256,
	pub amount_b_min: U256,
}

/// Router quote for a single-hop swap, with the route used to obtain it.
#[derive(Debug, Clone)]
pub struct SwapQuote {
	pub quote: AmountQuote,
	pub route: IRouter::Route,
}

/// `floor(amount_in * reserve_out / reserve_in)`, or `None` when either
/// reserve is zero.
pub fn quote_proportional(reserve_in: U256, reserve_out: U256, amount_in: U256) -> Option<U256> {
	if reserve_in.is_zero() || reserve_out.is_zero() {
		return None;
	}
	amount_in
		.checked_mul(reserve_out)
		.map(|product| product / reserve_in)
}

/// `floor(amount * bps / 10000)`.
fn mul_bps(amount: U256, bps: u64) -> U256 {
	let denominator = U256::from(BPS_DENOMINATOR);
	let bps = U256::from(bps);
	match amount.checked_mul(bps) {
		Some(product) => product / denominator,
		None => amount / denominator * bps + amount % denominator * bps / denominator,
	}
}

/// Minimum acceptable amount after subtracting `slippage_bps`.
pub fn apply_slippage(amount: U256, slippage_bps: u16) -> U256 {
	mul_bps(amount, BPS_DENOMINATOR.saturating_sub(slippage_bps as u64))
}

/// `percent_bps` of `amount`, capped at the whole amount.
pub fn percent_of(amount: U256, percent_bps: u16) -> U256 {
	mul_bps(amount, (percent_bps as u64).min(BPS_DENOMINATOR))
}

/// Zeroes every decimal digit below the two most significant ones.
///
/// `12345` becomes `12000`; values below 100 are unchanged.
pub fn reduce_precision(amount: U256) -> U256 {
	let ten = U256::from(10u64);
	let hundred = U256::from(100u64);

	let mut head = amount;
	let mut scale = U256::from(1u64);
	while head >= hundred {
		head /= ten;
		scale *= ten;
	}
	head * scale
}

/// Desired amount of the first leg of a liquidity addition.
///
/// The smaller of `percent_bps` of `balance_a` and the amount of A that the
/// entire `balance_b` pairs with at `reserve_a : reserve_b`. `None` when the
/// pool is empty.
pub fn cap_first_leg(
	balance_a: U256,
	balance_b: U256,
	reserve_a: U256,
	reserve_b: U256,
	percent_bps: u16,
) -> Option<U256> {
	let from_percent = percent_of(balance_a, percent_bps);
	let supported_by_b = quote_proportional(reserve_b, reserve_a, balance_b)?;
	Some(from_percent.min(supported_by_b))
}

/// Computes both legs of a liquidity addition against oriented reserves.
///
/// The capped first leg is precision-reduced before the paired amount is
/// derived from it. `None` when the pool is empty.
pub fn plan_liquidity(
	reserves: &OrientedReserves,
	balance_a: U256,
	balance_b: U256,
	percent_bps: u16,
	slippage_bps: u16,
) -> Option<LiquidityQuote> {
	let capped = cap_first_leg(
		balance_a,
		balance_b,
		reserves.reserve_in,
		reserves.reserve_out,
		percent_bps,
	)?;
	let amount_a_desired = reduce_precision(capped);
	let amount_b_desired =
		quote_proportional(reserves.reserve_in, reserves.reserve_out, amount_a_desired)?;

	Some(LiquidityQuote {
		amount_a_desired,
		amount_b_desired,
		amount_a_min: apply_slippage(amount_a_desired, slippage_bps),
		amount_b_min: apply_slippage(amount_b_desired, slippage_bps),
	})
}

/// Volatile single-hop route through `factory`.
pub fn route(from: Address, to: Address, factory: Address) -> IRouter::Route {
	IRouter::Route {
		from,
		to,
		stable: false,
		factory,
	}
}

/// Router- and pool-backed quoting.
pub struct QuoteEngine {
	client: Arc<dyn ChainClient>,
	multicall: MulticallBatcher,
	router: Address,
	factory: Option<Address>,
	slippage_bps: u16,
}

impl QuoteEngine {
	pub fn new(
		client: Arc<dyn ChainClient>,
		multicall: MulticallBatcher,
		router: Address,
		factory: Option<Address>,
		slippage_bps: u16,
	) -> Self {
		Self {
			client,
			multicall,
			router,
			factory,
			slippage_bps,
		}
	}

	pub fn router(&self) -> Address {
		self.router
	}

	/// Configured factory, or the router's `defaultFactory()`.
	pub async fn factory(&self) -> Result<Address, QuoteError> {
		match self.factory {
			Some(factory) => Ok(factory),
			None => Ok(contracts::read(
				self.client.as_ref(),
				self.router,
				&IRouter::defaultFactoryCall {},
			)
			.await?),
		}
	}

	/// Current reserves of the `token_a`/`token_b` pool in canonical order.
	///
	/// Ordering comes from the router's `sortTokens`; reserves and both
	/// decimals are then read in one batch. A pool that does not exist or
	/// holds nothing is reported as [`QuoteError::NoLiquidity`].
	pub async fn reserves(
		&self,
		token_a: Address,
		token_b: Address,
		stable: bool,
	) -> Result<PoolReserves, QuoteError> {
		let factory = self.factory().await?;
		let sorted = contracts::read(
			self.client.as_ref(),
			self.router,
			&IRouter::sortTokensCall {
				tokenA: token_a,
				tokenB: token_b,
			},
		)
		.await?;
		let (token0, token1) = (sorted.token0, sorted.token1);

		let results = self
			.multicall
			.batch(vec![
				Call::new(
					self.router,
					&IRouter::getReservesCall {
						tokenA: token0,
						tokenB: token1,
						stable,
						_factory: factory,
					},
				),
				Call::new(token0, &IERC20::decimalsCall {}),
				Call::new(token1, &IERC20::decimalsCall {}),
			])
			.await?;

		let reserves = results[0]
			.decode::<IRouter::getReservesCall>()
			.map_err(|e| {
				tracing::warn!(%token0, %token1, error = %e, "Pool reserves unavailable");
				QuoteError::NoLiquidity { token_a, token_b }
			})?;
		let decimals = |index: usize, token: Address| {
			results[index]
				.decode::<IERC20::decimalsCall>()
				.unwrap_or_else(|e| {
					tracing::warn!(%token, error = %e, "Using default decimals");
					DEFAULT_DECIMALS
				})
		};

		let pool = PoolReserves {
			token0,
			token1,
			reserve0: reserves.reserveA,
			reserve1: reserves.reserveB,
			decimals0: decimals(1, token0),
			decimals1: decimals(2, token1),
			stable,
		};
		if pool.is_empty() {
			return Err(QuoteError::NoLiquidity { token_a, token_b });
		}
		Ok(pool)
	}

	/// Router quote for swapping `amount_in` of `from` into `to`.
	pub async fn swap_quote(
		&self,
		from: Address,
		to: Address,
		amount_in: U256,
	) -> Result<SwapQuote, QuoteError> {
		let route = route(from, to, self.factory().await?);
		let amounts = contracts::read(
			self.client.as_ref(),
			self.router,
			&IRouter::getAmountsOutCall {
				amountIn: amount_in,
				routes: vec![route.clone()],
			},
		)
		.await?;

		let amount_out = amounts
			.last()
			.copied()
			.filter(|amount| !amount.is_zero())
			.ok_or(QuoteError::EmptyQuote { from, to })?;

		Ok(SwapQuote {
			quote: AmountQuote {
				amount_in,
				amount_out_or_paired: amount_out,
				amount_min: apply_slippage(amount_out, self.slippage_bps),
			},
			route,
		})
	}

	/// Amounts for adding liquidity to the `token_a`/`token_b` pool from the
	/// given balances.
	pub async fn liquidity_quote(
		&self,
		token_a: Address,
		token_b: Address,
		stable: bool,
		balance_a: U256,
		balance_b: U256,
		percent_bps: u16,
	) -> Result<LiquidityQuote, QuoteError> {
		let pool = self.reserves(token_a, token_b, stable).await?;
		let oriented = pool
			.oriented(token_a)
			.ok_or(QuoteError::TokenNotInPool(token_a))?;

		plan_liquidity(
			&oriented,
			balance_a,
			balance_b,
			percent_bps,
			self.slippage_bps,
		)
		.ok_or(QuoteError::NoLiquidity { token_a, token_b })
	}

	/// Value of each holding in `target`, quoted in one batch.
	///
	/// Holdings of `target` itself are returned as is and zero balances are
	/// not quoted. `None` marks a holding the router could not price.
	pub async fn value_holdings(
		&self,
		holdings: &[TokenBalance],
		target: Address,
	) -> Result<Vec<Option<U256>>, QuoteError> {
		let factory = self.factory().await?;
		let mut values: Vec<Option<U256>> = Vec::with_capacity(holdings.len());
		let mut pending = Vec::new();
		let mut requests = Vec::new();

		for (index, holding) in holdings.iter().enumerate() {
			if holding.token == target || holding.amount.is_zero() {
				values.push(Some(holding.amount));
			} else {
				values.push(None);
				pending.push(index);
				requests.push((holding.amount, route(holding.token, target, factory)));
			}
		}

		let quoted = self.multicall.amounts_out(self.router, &requests).await?;
		for (index, value) in pending.into_iter().zip(quoted) {
			values[index] = value;
		}
		Ok(values)
	}
}
