//! Read-only chain access for the offchain data resolver.
//!
//! The resolver only ever needs one primitive from the chain: a simulated
//! `eth_call` that either returns data or fails with an error that may carry
//! revert data. This crate defines that seam and an alloy-backed HTTP
//! implementation of it.

use alloy_primitives::Bytes;
use alloy_transport::TransportError;
use async_trait::async_trait;
use resolver_types::{with_0x_prefix, ConfigSchema, ImplementationRegistry, Transaction};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	#[cfg(any(test, feature = "testing"))]
	pub mod mock;
}

/// Errors that can occur while simulating a call.
#[derive(Debug, Error)]
pub enum ClientError {
	/// The call reverted with the given data.
	#[error("Execution reverted with data {}", with_0x_prefix(&hex::encode(data)))]
	Reverted { data: Bytes },
	/// The transport or node returned an error. JSON-RPC error responses keep
	/// their original payload, including any revert data.
	#[error("Transport error: {0}")]
	Transport(#[from] TransportError),
	/// The request could not be built.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
}

impl ClientError {
	/// Revert data carried directly by this error, if any.
	///
	/// For transport errors this reads the `data` member of a JSON-RPC error
	/// response.
	pub fn revert_data(&self) -> Option<Bytes> {
		match self {
			ClientError::Reverted { data } => Some(data.clone()),
			ClientError::Transport(err) => err.as_error_resp().and_then(|p| p.as_revert_data()),
			ClientError::InvalidRequest(_) => None,
		}
	}

	/// Whether the node executed the call and rejected it, as opposed to the
	/// request never reaching a node.
	pub fn is_execution_error(&self) -> bool {
		match self {
			ClientError::Reverted { .. } => true,
			ClientError::Transport(err) => err.as_error_resp().is_some(),
			ClientError::InvalidRequest(_) => false,
		}
	}
}

/// Trait defining the interface for chain clients.
///
/// Implementations must not sign or broadcast anything: every call is a
/// simulation against the latest state.
#[async_trait]
pub trait ClientInterface: Send + Sync {
	/// Returns the configuration schema for this client implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Simulates `tx` and returns its return data.
	async fn call(&self, tx: &Transaction) -> Result<Bytes, ClientError>;
}

/// Type alias for client factory functions.
pub type ClientFactory = fn(&toml::Value) -> Result<Box<dyn ClientInterface>, ClientError>;

/// Registry trait for client implementations.
pub trait ClientRegistry: ImplementationRegistry<Factory = ClientFactory> {}

/// Get all registered client implementations.
///
/// Returns a vector of (name, factory) tuples for all available client implementations.
pub fn get_all_implementations() -> Vec<(&'static str, ClientFactory)> {
	use implementations::evm::alloy;

	vec![(alloy::Registry::NAME, alloy::Registry::factory())]
}
