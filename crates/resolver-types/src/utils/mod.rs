//! Utility functions for hex and bytes32 conversions.

pub mod conversion;
pub mod formatting;

pub use conversion::{bytes32_to_string, Bytes32StringError};
pub use formatting::{truncate_hex, with_0x_prefix, without_0x_prefix};
