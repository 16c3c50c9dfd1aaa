//! Display helpers for ids, hex strings and USD values.

use rust_decimal::{Decimal, RoundingStrategy};

/// Shortens an id or address to its first 8 characters for logs.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

/// Adds a `0x` prefix unless one is already present.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Strips a `0x` or `0X` prefix if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Formats a USD value with two decimals, e.g. `$1.09`.
pub fn format_usd(value: Decimal) -> String {
	let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
	rounded.rescale(2);
	format!("${}", rounded)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(truncate_id("GBRPYHIL2CI3FNQ4"), "GBRPYHIL..");
		assert_eq!(truncate_id("0x1234567890abcdef"), "0x123456..");
	}

	#[test]
	fn test_hex_prefix() {
		let bare = "5fbdb2315678afecb367f032d93f642f64180aa3";
		let prefixed = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
		assert_eq!(with_0x_prefix(bare), prefixed);
		assert_eq!(with_0x_prefix(prefixed), prefixed);
		assert_eq!(without_0x_prefix(prefixed), bare);
		assert_eq!(without_0x_prefix("0X5fbd"), "5fbd");
		assert_eq!(without_0x_prefix(bare), bare);
	}

	#[test]
	fn test_format_usd() {
		assert_eq!(format_usd(Decimal::from_str("1.09").unwrap()), "$1.09");
		assert_eq!(format_usd(Decimal::from_str("0.125").unwrap()), "$0.13");
		assert_eq!(format_usd(Decimal::from(22)), "$22.00");
	}
}
