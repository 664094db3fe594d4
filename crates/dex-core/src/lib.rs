//! Core DEX operations for the executor.
//!
//! This crate turns the chain-client and transaction primitives of
//! `dex-delivery` into trading operations: typed contract reads, Multicall3
//! batching, balance and allowance management, quoting, and the swap and
//! liquidity workflows. [`WalletExecutor`] assembles all of it for one
//! wallet from the configuration.

pub mod balance;
pub mod contracts;
pub mod error;
pub mod executor;
pub mod multicall;
pub mod quote;
pub mod workflows;

pub use balance::{BalanceError, BalanceService, WalletReport};
pub use contracts::ContractError;
pub use error::{OperationError, OperationOutcome};
pub use executor::{PlanReport, StepReport, WalletExecutor};
pub use multicall::{MulticallBatcher, MulticallError};
pub use quote::{LiquidityQuote, QuoteEngine, QuoteError, SwapQuote};
