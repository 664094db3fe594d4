//! Single-hop router swaps.
//!
//! The input amount is a share of the wallet's balance of the input token,
//! precision-reduced, and the minimum output is the router quote less the
//! configured slippage. Native input is sent as value; ERC20 input is
//! approved for the exact amount first.

use super::{deadline, submit};
use crate::balance::BalanceService;
use crate::contracts;
use crate::error::{OperationError, OperationOutcome};
use crate::quote::{percent_of, reduce_precision, QuoteEngine};
use dex_delivery::{ContractCall, TransactionBuilder};
use dex_types::abi::IRouter;
use dex_types::{format_token_amount, truncate_id, Address, TokenConfig, U256};
use std::sync::Arc;
use tracing::instrument;

/// Swap `percent_bps` of the `from` balance into `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
	pub from: TokenConfig,
	pub to: TokenConfig,
	pub percent_bps: u16,
}

pub struct SwapWorkflow {
	builder: Arc<TransactionBuilder>,
	balances: Arc<BalanceService>,
	quotes: Arc<QuoteEngine>,
	deadline_seconds: u64,
}

impl SwapWorkflow {
	pub fn new(
		builder: Arc<TransactionBuilder>,
		balances: Arc<BalanceService>,
		quotes: Arc<QuoteEngine>,
		deadline_seconds: u64,
	) -> Self {
		Self {
			builder,
			balances,
			quotes,
			deadline_seconds,
		}
	}

	#[instrument(skip_all, fields(
		wallet = %truncate_id(&self.builder.address().to_string()),
		from = %request.from.symbol,
		to = %request.to.symbol,
	))]
	pub async fn execute(&self, request: &SwapRequest) -> Result<OperationOutcome, OperationError> {
		let (from, to) = (&request.from, &request.to);

		let balance = self.balances.get_balance(from.address).await?;
		let amount_in = reduce_precision(percent_of(balance.amount, request.percent_bps));
		if amount_in.is_zero() {
			tracing::warn!("Not enough {} to swap", from.symbol);
			return Err(OperationError::InsufficientBalance {
				token: from.symbol.clone(),
				available: balance.amount,
			});
		}

		let swap = self
			.quotes
			.swap_quote(from.address, to.address, amount_in)
			.await?;
		tracing::info!(
			amount_in = %format_token_amount(amount_in, from.decimals),
			expected_out = %format_token_amount(swap.quote.amount_out_or_paired, to.decimals),
			min_out = %format_token_amount(swap.quote.amount_min, to.decimals),
			"Quoted"
		);

		let router = self.quotes.router();
		let native_in = self.balances.is_native(from.address);
		if !native_in {
			self.balances
				.ensure_allowance(from.address, router, amount_in)
				.await?;
		}
		tracing::info!("Approval checked");

		let call = self.swap_call(
			router,
			native_in,
			self.balances.is_native(to.address),
			amount_in,
			swap.quote.amount_min,
			swap.route,
		);
		submit(&self.builder, call).await
	}

	fn swap_call(
		&self,
		router: Address,
		native_in: bool,
		native_out: bool,
		amount_in: U256,
		amount_out_min: U256,
		route: IRouter::Route,
	) -> ContractCall {
		let to = self.builder.address();
		let deadline = deadline(self.deadline_seconds);
		let routes = vec![route];

		if native_in {
			contracts::write_payable(
				router,
				&IRouter::swapExactETHForTokensCall {
					amountOutMin: amount_out_min,
					routes,
					to,
					deadline,
					referrer: Address::ZERO,
				},
				amount_in,
			)
		} else if native_out {
			contracts::write(
				router,
				&IRouter::swapExactTokensForETHCall {
					amountIn: amount_in,
					amountOutMin: amount_out_min,
					routes,
					to,
					deadline,
					referrer: Address::ZERO,
				},
			)
		} else {
			contracts::write(
				router,
				&IRouter::swapExactTokensForTokensCall {
					amountIn: amount_in,
					amountOutMin: amount_out_min,
					routes,
					to,
					deadline,
					referrer: Address::ZERO,
				},
			)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::{
		scripted_chain, services, token, DEV_ADDRESS, FACTORY, RISE, ROUTER, USDC, WXRP,
	};
	use alloy::sol_types::SolCall;
	use dex_delivery::implementations::mock::{MockChainClient, ReceiptMode};
	use dex_types::abi::IERC20;

	fn workflow(mock: Arc<MockChainClient>) -> SwapWorkflow {
		let (builder, balances, quotes) = services(mock);
		SwapWorkflow::new(builder, balances, quotes, 900)
	}

	fn request(from: Address, to: Address, percent_bps: u16) -> SwapRequest {
		SwapRequest {
			from: token(from),
			to: token(to),
			percent_bps,
		}
	}

	fn quote_out(mock: &MockChainClient, amount_in: u64, amount_out: u64) {
		mock.on_call::<IRouter::getAmountsOutCall, _>(
			ROUTER,
			vec![U256::from(amount_in), U256::from(amount_out)],
		);
	}

	fn assert_no_transaction_built(mock: &MockChainClient) {
		for method in [
			"eth_chainId",
			"eth_getTransactionCount",
			"eth_estimateGas",
			"eth_sendRawTransaction",
		] {
			assert_eq!(mock.count(method), 0, "{} was called", method);
		}
	}

	#[tokio::test]
	async fn test_native_in_sends_value_without_approval() {
		let mock = scripted_chain();
		mock.set_balance(DEV_ADDRESS, U256::from(12_345_678u64));
		quote_out(&mock, 12_000_000, 3_000);
		let workflow = workflow(mock.clone());

		let outcome = workflow
			.execute(&request(WXRP, RISE, 10_000))
			.await
			.unwrap();
		assert!(outcome.is_confirmed());

		let submitted = mock.submitted();
		assert_eq!(submitted.len(), 1);
		assert_eq!(submitted[0].to, Some(ROUTER));
		assert_eq!(submitted[0].value, U256::from(12_000_000u64));

		let swap = IRouter::swapExactETHForTokensCall::abi_decode(&submitted[0].input).unwrap();
		assert_eq!(swap.amountOutMin, U256::from(2_850u64));
		assert_eq!(swap.to, DEV_ADDRESS);
		assert_eq!(swap.referrer, Address::ZERO);
		assert_eq!(swap.routes.len(), 1);
		assert_eq!(swap.routes[0].from, WXRP);
		assert_eq!(swap.routes[0].to, RISE);
		assert_eq!(swap.routes[0].factory, FACTORY);
		assert!(!swap.routes[0].stable);
	}

	#[tokio::test]
	async fn test_token_to_native_approves_first() {
		let mock = scripted_chain();
		mock.on_call::<IERC20::balanceOfCall, _>(RISE, U256::from(4_321u64));
		mock.on_call::<IERC20::allowanceCall, _>(RISE, U256::ZERO);
		quote_out(&mock, 2_100, 900);
		let workflow = workflow(mock.clone());

		let outcome = workflow.execute(&request(RISE, WXRP, 5_000)).await.unwrap();
		assert!(outcome.is_confirmed());

		let submitted = mock.submitted();
		assert_eq!(submitted.len(), 2);
		let approve = IERC20::approveCall::abi_decode(&submitted[0].input).unwrap();
		assert_eq!(submitted[0].to, Some(RISE));
		assert_eq!(approve.spender, ROUTER);
		assert_eq!(approve.amount, U256::from(2_100u64));

		let swap = IRouter::swapExactTokensForETHCall::abi_decode(&submitted[1].input).unwrap();
		assert_eq!(swap.amountIn, U256::from(2_100u64));
		assert_eq!(swap.amountOutMin, U256::from(855u64));
		assert!(submitted[1].value.is_zero());
	}

	#[tokio::test]
	async fn test_token_to_token_with_existing_allowance() {
		let mock = scripted_chain();
		mock.on_call::<IERC20::balanceOfCall, _>(RISE, U256::from(1_000u64));
		mock.on_call::<IERC20::allowanceCall, _>(RISE, U256::from(1_000u64));
		quote_out(&mock, 1_000, 500);
		let workflow = workflow(mock.clone());

		workflow.execute(&request(RISE, USDC, 10_000)).await.unwrap();

		let submitted = mock.submitted();
		assert_eq!(submitted.len(), 1);
		assert_eq!(
			submitted[0].selector(),
			Some(IRouter::swapExactTokensForTokensCall::SELECTOR)
		);
	}

	#[tokio::test]
	async fn test_zero_balance_builds_nothing() {
		let mock = scripted_chain();
		mock.on_call::<IERC20::balanceOfCall, _>(RISE, U256::ZERO);
		let workflow = workflow(mock.clone());

		let err = workflow
			.execute(&request(RISE, WXRP, 5_000))
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OperationError::InsufficientBalance { ref token, .. } if token == "RISE"
		));
		assert_no_transaction_built(&mock);
	}

	#[tokio::test]
	async fn test_unquotable_swap_builds_nothing() {
		let mock = scripted_chain();
		mock.set_balance(DEV_ADDRESS, U256::from(1_000u64));
		mock.revert_call::<IRouter::getAmountsOutCall>(ROUTER, "INSUFFICIENT_LIQUIDITY");
		let workflow = workflow(mock.clone());

		let err = workflow
			.execute(&request(WXRP, RISE, 5_000))
			.await
			.unwrap_err();
		assert!(matches!(err, OperationError::NoQuote(_)));
		assert!(err.is_skip());
		assert_no_transaction_built(&mock);
	}

	#[tokio::test]
	async fn test_reverted_swap_is_an_outcome() {
		let mock = scripted_chain();
		mock.set_balance(DEV_ADDRESS, U256::from(1_000u64));
		mock.set_receipt_mode(ReceiptMode::Revert);
		quote_out(&mock, 1_000, 10);
		let workflow = workflow(mock.clone());

		let outcome = workflow
			.execute(&request(WXRP, RISE, 10_000))
			.await
			.unwrap();
		assert!(matches!(outcome, OperationOutcome::Reverted(ref r) if !r.success));
	}

	#[tokio::test(start_paused = true)]
	async fn test_unmined_swap_times_out() {
		let mock = scripted_chain();
		mock.set_balance(DEV_ADDRESS, U256::from(1_000u64));
		mock.set_receipt_mode(ReceiptMode::Pending);
		quote_out(&mock, 1_000, 10);
		let workflow = workflow(mock.clone());

		let outcome = workflow
			.execute(&request(WXRP, RISE, 10_000))
			.await
			.unwrap();
		assert_eq!(outcome, OperationOutcome::TimedOut(mock.submitted()[0].hash));
	}

	#[tokio::test]
	async fn test_gas_estimation_failure_is_an_error() {
		let mock = scripted_chain();
		mock.set_balance(DEV_ADDRESS, U256::from(1_000u64));
		mock.fail_gas_estimate("execution reverted: Router: INSUFFICIENT_OUTPUT_AMOUNT");
		quote_out(&mock, 1_000, 10);
		let workflow = workflow(mock.clone());

		let err = workflow
			.execute(&request(WXRP, RISE, 10_000))
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OperationError::Delivery(ref e)
				if e.revert_reason() == Some("execution reverted: Router: INSUFFICIENT_OUTPUT_AMOUNT")
		));
		assert!(mock.submitted().is_empty());
	}
}
