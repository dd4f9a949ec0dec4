//! Conversion utilities for on-chain identifiers.

use alloy_primitives::FixedBytes;
use thiserror::Error;

/// Error returned when a bytes32 identifier is not valid UTF-8.
#[derive(Debug, Error)]
#[error("bytes32 value {value} is not a UTF-8 string")]
pub struct Bytes32StringError {
	pub value: FixedBytes<32>,
}

/// Converts a right-padded bytes32 into the string it encodes.
///
/// Trailing zero bytes are trimmed; the remainder must be valid UTF-8.
/// This is how oracle contracts publish their data-source id (`"PYTH"`
/// becomes `0x50595448` followed by 28 zero bytes).
pub fn bytes32_to_string(value: &FixedBytes<32>) -> Result<String, Bytes32StringError> {
	let end = value
		.iter()
		.rposition(|&b| b != 0)
		.map(|i| i + 1)
		.unwrap_or(0);

	String::from_utf8(value[..end].to_vec()).map_err(|_| Bytes32StringError { value: *value })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn right_padded(s: &[u8]) -> FixedBytes<32> {
		let mut out = [0u8; 32];
		out[..s.len()].copy_from_slice(s);
		FixedBytes::from(out)
	}

	#[test]
	fn test_bytes32_to_string_trims_right() {
		assert_eq!(bytes32_to_string(&right_padded(b"PYTH")).unwrap(), "PYTH");
		assert_eq!(
			bytes32_to_string(&right_padded(b"CHAINLINK_DATA_STREAMS")).unwrap(),
			"CHAINLINK_DATA_STREAMS"
		);
	}

	#[test]
	fn test_bytes32_to_string_empty() {
		assert_eq!(bytes32_to_string(&FixedBytes::ZERO).unwrap(), "");
	}

	#[test]
	fn test_bytes32_to_string_rejects_invalid_utf8() {
		assert!(bytes32_to_string(&right_padded(&[0xff, 0xfe])).is_err());
	}
}
