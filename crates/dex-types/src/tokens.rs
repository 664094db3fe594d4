//! Token configuration and registry.
//!
//! Tokens are declared once in configuration as `{symbol, address, decimals}`
//! records and resolved into a [`TokenRegistry`] at startup. Every component
//! that needs a token address or display name receives the registry instead
//! of re-deriving it per call.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Configuration for a token on the target network.
///
/// # Fields
///
/// * `address` - The on-chain address of the token contract
/// * `symbol` - The token symbol (e.g., "WXRP", "RISE")
/// * `decimals` - The number of decimal places for the token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TokenConfig {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
}

/// Errors raised while building or querying the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenRegistryError {
	#[error("Duplicate token symbol: {0}")]
	DuplicateSymbol(String),
	#[error("Duplicate token address: {0}")]
	DuplicateAddress(Address),
	#[error("Unknown token symbol: {0}")]
	UnknownSymbol(String),
}

/// Lookup table of configured tokens, keyed by symbol and by address.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
	tokens: Vec<TokenConfig>,
	by_symbol: HashMap<String, usize>,
	by_address: HashMap<Address, usize>,
}

impl TokenRegistry {
	/// Builds the registry, rejecting duplicate symbols or addresses.
	pub fn new(tokens: Vec<TokenConfig>) -> Result<Self, TokenRegistryError> {
		let mut by_symbol = HashMap::new();
		let mut by_address = HashMap::new();
		for (index, token) in tokens.iter().enumerate() {
			if by_symbol.insert(token.symbol.clone(), index).is_some() {
				return Err(TokenRegistryError::DuplicateSymbol(token.symbol.clone()));
			}
			if by_address.insert(token.address, index).is_some() {
				return Err(TokenRegistryError::DuplicateAddress(token.address));
			}
		}
		Ok(Self {
			tokens,
			by_symbol,
			by_address,
		})
	}

	pub fn by_symbol(&self, symbol: &str) -> Result<&TokenConfig, TokenRegistryError> {
		self.by_symbol
			.get(symbol)
			.map(|index| &self.tokens[*index])
			.ok_or_else(|| TokenRegistryError::UnknownSymbol(symbol.to_string()))
	}

	pub fn by_address(&self, address: &Address) -> Option<&TokenConfig> {
		self.by_address.get(address).map(|index| &self.tokens[*index])
	}

	/// Tokens in declaration order.
	pub fn tokens(&self) -> &[TokenConfig] {
		&self.tokens
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}
}

/// Balance of one token held by one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
	pub token: Address,
	pub name: String,
	pub decimals: u8,
	pub amount: U256,
}
