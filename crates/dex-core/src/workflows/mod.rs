//! Swap and liquidity workflows.
//!
//! Each workflow runs one operation for one wallet through
//! `Quoted -> ApprovalChecked -> Submitted -> Confirmed | Reverted | TimedOut`.
//! Balance and quote problems found before submission end the operation
//! with an error and nothing is sent.

use crate::error::{OperationError, OperationOutcome};
use dex_delivery::{ContractCall, DeliveryError, TransactionBuilder};
use dex_types::{truncate_id, U256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod liquidity;
pub mod swap;

pub use liquidity::{LiquidityRequest, LiquidityWorkflow};
pub use swap::{SwapRequest, SwapWorkflow};

/// Unix timestamp `seconds` from now.
pub(crate) fn deadline(seconds: u64) -> U256 {
	let now = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_secs())
		.unwrap_or_default();
	U256::from(now.saturating_add(seconds))
}

/// Sends `call` and maps the delivery result to an outcome.
///
/// A mined transaction is an outcome whatever its status. A receipt timeout
/// is an outcome too: the transaction may still land, so it is reported
/// rather than retried.
pub(crate) async fn submit(
	builder: &TransactionBuilder,
	call: ContractCall,
) -> Result<OperationOutcome, OperationError> {
	tracing::info!(to = %call.to, value = %call.value, "Submitting");
	match builder.execute(call).await {
		Ok(receipt) if receipt.success => Ok(OperationOutcome::Confirmed(receipt)),
		Ok(receipt) => Ok(OperationOutcome::Reverted(receipt)),
		Err(DeliveryError::Timeout { hash, seconds }) => {
			tracing::warn!(
				tx_hash = %truncate_id(&hash.to_string()),
				"Transaction not mined after {}s, check the explorer before retrying",
				seconds
			);
			Ok(OperationOutcome::TimedOut(hash))
		},
		Err(e) => {
			tracing::error!(
				error = %e,
				revert_reason = e.revert_reason().unwrap_or_default(),
				"Transaction failed"
			);
			Err(e.into())
		},
	}
}
