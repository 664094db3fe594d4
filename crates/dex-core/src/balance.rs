//! Balance and allowance management for one wallet.
//!
//! The wrapped-native token is treated as the chain's native currency: its
//! balance is the account balance and it never needs an allowance. Every
//! other token is read through its ERC20 contract.

use crate::contracts::{self, ContractError};
use crate::error::OperationError;
use crate::multicall::{MulticallBatcher, MulticallError, UNKNOWN_TOKEN_NAME};
use dex_delivery::{DeliveryError, TransactionBuilder};
use dex_types::abi::IERC20;
use dex_types::{truncate_id, Address, Call, DecodeError, TokenBalance, U256};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Decimals of the chain's native currency.
pub const NATIVE_DECIMALS: u8 = 18;
/// Name reported for the native balance.
pub const NATIVE_NAME: &str = "Native";

/// Errors from balance and allowance reads.
#[derive(Debug, Error)]
pub enum BalanceError {
	#[error("Account query failed: {0}")]
	Delivery(#[from] DeliveryError),
	#[error("Token read failed: {0}")]
	Contract(#[from] ContractError),
	#[error(transparent)]
	Multicall(#[from] MulticallError),
	#[error(transparent)]
	Decode(#[from] DecodeError),
}

/// Snapshot of one wallet's holdings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletReport {
	pub address: Address,
	pub nonce: u64,
	pub native: U256,
	pub tokens: Vec<TokenBalance>,
}

/// Balance lookups and allowance management for the builder's account.
pub struct BalanceService {
	builder: Arc<TransactionBuilder>,
	multicall: MulticallBatcher,
	wrapped_native: Address,
}

impl BalanceService {
	pub fn new(
		builder: Arc<TransactionBuilder>,
		multicall: MulticallBatcher,
		wrapped_native: Address,
	) -> Self {
		Self {
			builder,
			multicall,
			wrapped_native,
		}
	}

	/// Address of the wallet.
	pub fn owner(&self) -> Address {
		self.builder.address()
	}

	pub fn is_native(&self, token: Address) -> bool {
		token == self.wrapped_native
	}

	/// Balance of `token` held by the wallet.
	///
	/// The native branch issues a single `eth_getBalance`; ERC20 tokens are
	/// read with one batch of `name`, `decimals` and `balanceOf`, where only
	/// the name may fall back to a default.
	pub async fn get_balance(&self, token: Address) -> Result<TokenBalance, BalanceError> {
		let owner = self.owner();
		if self.is_native(token) {
			let amount = self.builder.client().balance(owner).await?;
			return Ok(TokenBalance {
				token,
				name: NATIVE_NAME.to_string(),
				decimals: NATIVE_DECIMALS,
				amount,
			});
		}

		let results = self
			.multicall
			.batch(vec![
				Call::new(token, &IERC20::nameCall {}),
				Call::new(token, &IERC20::decimalsCall {}).required(),
				Call::new(token, &IERC20::balanceOfCall { owner }).required(),
			])
			.await?;

		Ok(TokenBalance {
			token,
			name: results[0]
				.decode::<IERC20::nameCall>()
				.unwrap_or_else(|_| UNKNOWN_TOKEN_NAME.to_string()),
			decimals: results[1].decode::<IERC20::decimalsCall>()?,
			amount: results[2].decode::<IERC20::balanceOfCall>()?,
		})
	}

	/// Current allowance of `spender` over the wallet's `token`.
	pub async fn allowance(&self, token: Address, spender: Address) -> Result<U256, BalanceError> {
		let owner = self.owner();
		Ok(contracts::read(
			self.builder.client().as_ref(),
			token,
			&IERC20::allowanceCall { owner, spender },
		)
		.await?)
	}

	/// Makes sure `spender` may transfer `amount` of `token`.
	///
	/// Approves exactly `amount` when it exceeds the current allowance and
	/// waits for the approval to be mined. Returns whether an approval was
	/// sent.
	///
	/// # Errors
	///
	/// * [`OperationError::FatalApproval`] if the approval transaction fails,
	///   reverts or is not mined in time.
	/// * [`OperationError::InsufficientAllowanceCoverage`] if the allowance
	///   still falls short after a mined approval.
	#[instrument(skip_all, fields(token = %truncate_id(&token.to_string()), spender = %truncate_id(&spender.to_string())))]
	pub async fn ensure_allowance(
		&self,
		token: Address,
		spender: Address,
		amount: U256,
	) -> Result<bool, OperationError> {
		let current = self.allowance(token, spender).await?;
		if amount <= current {
			tracing::debug!(%current, %amount, "Allowance sufficient");
			return Ok(false);
		}

		tracing::info!(%current, %amount, "Approving token");
		let approve = contracts::write(token, &IERC20::approveCall { spender, amount });
		let receipt = self.builder.execute(approve).await.map_err(|e| {
			tracing::error!(error = %e, "Approval failed");
			OperationError::FatalApproval {
				token,
				reason: e.revert_reason().map_or_else(|| e.to_string(), str::to_string),
			}
		})?;
		if !receipt.success {
			return Err(OperationError::FatalApproval {
				token,
				reason: format!("approval {} reverted", receipt.hash),
			});
		}

		let available = self.allowance(token, spender).await?;
		if available < amount {
			return Err(OperationError::InsufficientAllowanceCoverage {
				token,
				required: amount,
				available,
			});
		}
		Ok(true)
	}

	/// Native balance, nonce and balances of `tokens`, the tokens read in a
	/// single batch.
	pub async fn wallet_report(&self, tokens: &[Address]) -> Result<WalletReport, BalanceError> {
		let address = self.owner();
		let client = self.builder.client();
		let native = client.balance(address).await?;
		let nonce = client.transaction_count(address).await?;
		let tokens = self.multicall.token_balances(address, tokens).await?;

		Ok(WalletReport {
			address,
			nonce,
			native,
			tokens,
		})
	}
}
