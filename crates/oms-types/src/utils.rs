//! Utility functions shared across the service.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Truncates an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}

/// Generates a human-readable business number such as `ORD-20250101-3FA9C1D2`.
///
/// The suffix is the first 8 hex characters of a v4 UUID, uppercased, which
/// is collision-resistant at the write rates this service sees.
pub fn business_number(prefix: &str, now: DateTime<Utc>) -> String {
	let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
	format!("{}-{}-{}", prefix, now.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("short"), "short");
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(truncate_id("123456789abc"), "12345678..");
	}

	#[test]
	fn test_business_number_shape() {
		let now = Utc::now();
		let number = business_number("ORD", now);
		let parts: Vec<&str> = number.split('-').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[0], "ORD");
		assert_eq!(parts[1], now.format("%Y%m%d").to_string());
		assert_eq!(parts[2].len(), 8);
		assert!(parts[2].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
	}
}
