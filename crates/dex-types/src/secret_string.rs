//! Secure string type for wallet private keys.
//!
//! `SecretString` zeroes its memory on drop and redacts itself in `Debug`,
//! `Display` and serialized output. Wallet keys travel through configuration
//! in this type until the account implementation parses them into a signer.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// A string that is zeroed on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Hands the secret to a closure, limiting the scope in which it is exposed.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(self.0.trim())
	}

	/// Short label safe for logs: the last four characters, e.g. `...ff80`.
	pub fn masked(&self) -> String {
		let trimmed = self.0.trim();
		let tail: String = trimmed
			.chars()
			.rev()
			.take(4)
			.collect::<Vec<_>>()
			.into_iter()
			.rev()
			.collect();
		format!("...{}", tail)
	}

	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[test]
	fn test_key_never_printed() {
		let secret = SecretString::from(KEY);
		assert_eq!(format!("{:?}", secret), "SecretString(***REDACTED***)");
		assert_eq!(format!("{}", secret), "***REDACTED***");
		assert_eq!(serde_json::to_string(&secret).unwrap(), "\"***REDACTED***\"");
	}

	#[test]
	fn test_masked_label() {
		assert_eq!(SecretString::from(KEY).masked(), "...ff80");
		assert_eq!(SecretString::from("ab").masked(), "...ab");
	}

	#[test]
	fn test_with_exposed_trims_whitespace() {
		let secret = SecretString::from(" 0x01\n");
		assert_eq!(secret.with_exposed(|s| s.to_string()), "0x01");
		assert!(SecretString::from("   ").is_empty());
	}
}
