//! String formatting utilities.
//!
//! Provides helpers for hex prefix management and for shortening long hex
//! payloads in log lines.

/// Shortens a hex string for display.
///
/// Keeps the first `keep` characters after the prefix and appends the total
/// byte length, e.g. `0x12345678..(68 bytes)`. Input that is not actually
/// hex is cut on a character boundary.
pub fn truncate_hex(hex_str: &str, keep: usize) -> String {
	let digits = without_0x_prefix(hex_str);
	match digits.char_indices().nth(keep) {
		None => with_0x_prefix(digits),
		Some((end, _)) => format!("0x{}..({} bytes)", &digits[..end], digits.len() / 2),
	}
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_prefix_helpers() {
		assert_eq!(with_0x_prefix("abcd"), "0xabcd");
		assert_eq!(with_0x_prefix("0xabcd"), "0xabcd");
		assert_eq!(without_0x_prefix("0Xabcd"), "abcd");
		assert_eq!(without_0x_prefix("abcd"), "abcd");
	}

	#[test]
	fn test_truncate_hex() {
		assert_eq!(truncate_hex("0x1234", 8), "0x1234");
		assert_eq!(
			truncate_hex("0x1234567890abcdef", 8),
			"0x12345678..(8 bytes)"
		);
	}

	#[test]
	fn test_truncate_non_ascii() {
		assert_eq!(truncate_hex("aéééé", 4), "0xaééé..(4 bytes)");
		assert_eq!(truncate_hex("éé", 2), "0xéé");
		assert_eq!(truncate_hex("<html>…</html>", 16), "0x<html>…</html>");
	}
}
