//! Solidity bindings for the contracts the executor interacts with.
//!
//! All calls are encoded and decoded through `alloy::sol_types::SolCall`;
//! nothing here knows about providers or transports.

use alloy::primitives::{address, Address};
use alloy::sol;

/// Canonical Multicall3 deployment address, identical on most EVM chains.
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

sol! {
	/// Minimal ERC20 surface.
	#[derive(Debug)]
	interface IERC20 {
		function name() external view returns (string);
		function decimals() external view returns (uint8);
		function balanceOf(address owner) external view returns (uint256);
		function allowance(address owner, address spender) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
	}
}

sol! {
	/// Multicall3 `aggregate3` entry point.
	#[derive(Debug)]
	interface IMulticall3 {
		struct Call3 {
			address target;
			bool allowFailure;
			bytes callData;
		}

		struct Call3Result {
			bool success;
			bytes returnData;
		}

		function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
	}
}

sol! {
	/// Solidly-style AMM router with stable/volatile routes.
	#[derive(Debug)]
	interface IRouter {
		struct Route {
			address from;
			address to;
			bool stable;
			address factory;
		}

		function defaultFactory() external view returns (address);
		function sortTokens(address tokenA, address tokenB) external pure returns (address token0, address token1);
		function getReserves(address tokenA, address tokenB, bool stable, address _factory) external view returns (uint256 reserveA, uint256 reserveB);
		function getAmountsOut(uint256 amountIn, Route[] memory routes) external view returns (uint256[] memory amounts);

		function swapExactETHForTokens(uint256 amountOutMin, Route[] calldata routes, address to, uint256 deadline, address referrer) external payable returns (uint256[] memory amounts);
		function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, Route[] calldata routes, address to, uint256 deadline, address referrer) external returns (uint256[] memory amounts);
		function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, Route[] calldata routes, address to, uint256 deadline, address referrer) external returns (uint256[] memory amounts);

		function addLiquidity(address tokenA, address tokenB, bool stable, uint256 amountADesired, uint256 amountBDesired, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);
		function addLiquidityETH(address token, bool stable, uint256 amountTokenDesired, uint256 amountTokenMin, uint256 amountETHMin, address to, uint256 deadline) external payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::sol_types::SolCall;

	#[test]
	fn test_erc20_selectors() {
		assert_eq!(IERC20::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
		assert_eq!(IERC20::allowanceCall::SELECTOR, [0xdd, 0x62, 0xed, 0x3e]);
		assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
	}

	#[test]
	fn test_aggregate3_selector() {
		assert_eq!(IMulticall3::aggregate3Call::SELECTOR, [0x82, 0xad, 0x56, 0xcb]);
	}
}
