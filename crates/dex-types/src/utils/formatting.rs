//! String formatting utilities.
//!
//! Provides helpers for shortening hashes in log fields, rendering raw token
//! amounts with their decimals, and building explorer links.

use alloy::primitives::U256;

/// Shortens a hex identifier for log fields: the first 10 characters
/// (`0x` plus four bytes) followed by `..`.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Formats a raw on-chain token amount with decimal places for display.
///
/// Trailing fractional zeros are dropped, so `1500000` with 6 decimals
/// renders as `1.5` and `1000000` as `1`.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	let amount = amount.to_string();
	if decimals == 0 {
		return amount;
	}

	let decimal_places = decimals as usize;

	let (integer_part, decimal_part) = if amount.len() <= decimal_places {
		let decimal_str = format!("{:0>width$}", amount, width = decimal_places);
		("0".to_string(), decimal_str)
	} else {
		let split_pos = amount.len() - decimal_places;
		(
			amount[..split_pos].to_string(),
			amount[split_pos..].to_string(),
		)
	};

	let decimal_trimmed = decimal_part.trim_end_matches('0');

	if decimal_trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, decimal_trimmed)
	}
}

/// Joins an explorer base URL and a transaction hash.
///
/// The base may or may not end with `/`; both produce a single separator.
pub fn explorer_link(base: &str, tx_hash: &str) -> String {
	format!("{}/{}", base.trim_end_matches('/'), tx_hash)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0x12345678"), "0x12345678");
		assert_eq!(truncate_id("0x1234567890abcdef"), "0x12345678..");
	}

	#[test]
	fn test_format_token_amount() {
		assert_eq!(format_token_amount(U256::from(10u64).pow(U256::from(18)), 18), "1");
		assert_eq!(
			format_token_amount(U256::from(1_500_000_000_000_000_000u128), 18),
			"1.5"
		);
		assert_eq!(
			format_token_amount(U256::from(100_000_000_000_000_000u128), 18),
			"0.1"
		);
		assert_eq!(format_token_amount(U256::from(1_500_000u64), 6), "1.5");
		assert_eq!(format_token_amount(U256::from(25u64), 6), "0.000025");
		assert_eq!(format_token_amount(U256::ZERO, 18), "0");
		assert_eq!(format_token_amount(U256::from(1000u64), 0), "1000");
	}

	#[test]
	fn test_explorer_link() {
		assert_eq!(
			explorer_link("https://explorer.example/tx/", "0xabc"),
			"https://explorer.example/tx/0xabc"
		);
		assert_eq!(
			explorer_link("https://explorer.example/tx", "0xabc"),
			"https://explorer.example/tx/0xabc"
		);
	}
}
