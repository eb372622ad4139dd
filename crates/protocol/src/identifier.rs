//! Platform-assigned item identifiers and their validity predicate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive digit-count bounds for a platform item identifier.
pub const ID_MIN_DIGITS: usize = 18;
pub const ID_MAX_DIGITS: usize = 20;

/// Durable identifier assigned by the platform to one published item.
///
/// The only values that ever become an `ItemId` are pure ASCII digit strings
/// of 18 to 20 digits. Anything else is rejected at the [`ItemId::parse`]
/// boundary; capture code treats a rejected candidate as "not captured",
/// never as a value to pass along.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
	/// Accepts `candidate` only when it satisfies the identifier predicate.
	pub fn parse(candidate: &str) -> Option<Self> {
		is_valid_id(candidate).then(|| Self(candidate.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ItemId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Returns `true` when `candidate` is a pure digit string of 18 to 20 digits.
pub fn is_valid_id(candidate: &str) -> bool {
	(ID_MIN_DIGITS..=ID_MAX_DIGITS).contains(&candidate.len()) && candidate.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_snowflake_sized_digit_strings() {
		assert!(ItemId::parse("123456789012345678").is_some());
		assert!(ItemId::parse("1234567890123456789").is_some());
		assert!(ItemId::parse("12345678901234567890").is_some());
	}

	#[test]
	fn rejects_wrong_lengths() {
		assert!(ItemId::parse("12345678901234567").is_none());
		assert!(ItemId::parse("123456789012345678901").is_none());
		assert!(ItemId::parse("").is_none());
	}

	#[test]
	fn rejects_non_digit_content() {
		assert!(ItemId::parse("12345678901234567a").is_none());
		assert!(ItemId::parse("abcdefghijklmnopqr").is_none());
		assert!(ItemId::parse("1234567890123456 8").is_none());
	}

	#[test]
	fn serializes_transparently() {
		let id = ItemId::parse("123456789012345678").unwrap();
		assert_eq!(serde_json::to_string(&id).unwrap(), "\"123456789012345678\"");
	}
}
