//! Common types module for the DEX executor.
//!
//! This module defines the core data types shared by every crate in the
//! workspace: transaction envelopes and receipts, fee quotes, multicall
//! call/result pairs, pool reserves and amount quotes, the token registry,
//! and the Solidity bindings for the contracts the executor talks to.

/// Solidity interface bindings (ERC20, Multicall3, router).
pub mod abi;
/// Transaction envelope, fee and receipt types.
pub mod delivery;
/// Multicall call and result types.
pub mod multicall;
/// Pool reserve and quote types.
pub mod pool;
/// Secure wrapper for private keys.
pub mod secret_string;
/// Token configuration and registry.
pub mod tokens;
/// Formatting helpers.
pub mod utils;

pub use abi::MULTICALL3_ADDRESS;
pub use alloy::primitives::{Address, Bytes, TxHash, U256};
pub use delivery::*;
pub use multicall::*;
pub use pool::*;
pub use secret_string::SecretString;
pub use tokens::{TokenBalance, TokenConfig, TokenRegistry, TokenRegistryError};
pub use utils::{explorer_link, format_token_amount, truncate_id};
