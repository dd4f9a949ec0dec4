//! Common types module for the offchain data resolver.
//!
//! This module defines the core data types shared by every resolver crate:
//! the transaction shape handed to the engine, oracle queries and their
//! resolved payloads, the classified revert outcome, the Solidity bindings
//! for the on-chain interfaces involved, and configuration validation.

/// Solidity bindings for the oracle, forwarder and smart-account interfaces.
pub mod abi;
/// Oracle query, payload and revert outcome types.
pub mod oracle;
/// Base trait for self-registering implementations.
pub mod registry;
/// Transaction request type passed through the resolution loop.
pub mod transaction;
/// Utility functions for hex and bytes32 conversions.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use alloy_primitives::{Address, Bytes, U256};
pub use oracle::*;
pub use registry::ImplementationRegistry;
pub use transaction::Transaction;
pub use utils::{bytes32_to_string, truncate_hex, with_0x_prefix, without_0x_prefix};
pub use validation::*;
