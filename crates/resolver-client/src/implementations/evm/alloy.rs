//! Alloy-based EVM client implementation.
//!
//! Simulates calls over HTTP JSON-RPC using an alloy `RootProvider`. No
//! fillers or wallet are attached: the resolver only reads.

use crate::{ClientError, ClientInterface};
use alloy_primitives::Bytes;
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use resolver_types::{
	truncate_hex, ConfigSchema, Field, FieldType, Schema, Transaction, ValidationError,
};

/// Alloy-based HTTP client for one EVM network.
pub struct AlloyClient {
	/// Provider used for `eth_call`.
	provider: RootProvider,
}

impl AlloyClient {
	/// Creates a new AlloyClient for the given RPC endpoint.
	pub fn new(rpc_url: &str) -> Result<Self, ClientError> {
		let url: reqwest::Url = rpc_url
			.parse()
			.map_err(|e| ClientError::InvalidRequest(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

		Ok(Self {
			provider: RootProvider::new_http(url),
		})
	}
}

/// Configuration schema for the Alloy client.
pub struct AlloyClientSchema;

impl AlloyClientSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for AlloyClientSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![Field::new("rpc_url", FieldType::Url)], vec![]);
		schema.validate(config)
	}
}

#[async_trait]
impl ClientInterface for AlloyClient {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyClientSchema)
	}

	async fn call(&self, tx: &Transaction) -> Result<Bytes, ClientError> {
		let request: TransactionRequest = tx.clone().into();

		match self.provider.call(request).await {
			Ok(data) => Ok(data),
			Err(e) => {
				// The original error is returned untouched; callers that need
				// revert data read it from the JSON-RPC error payload.
				if let Some(data) = e.as_error_resp().and_then(|p| p.as_revert_data()) {
					tracing::debug!(
						to = ?tx.to,
						revert = %truncate_hex(&data.to_string(), 8),
						"Simulated call reverted"
					);
				}
				Err(ClientError::Transport(e))
			},
		}
	}
}

/// Factory function to create an HTTP client from configuration.
///
/// Required configuration parameters:
/// - `rpc_url`: HTTP(S) JSON-RPC endpoint
pub fn create_http_client(config: &toml::Value) -> Result<Box<dyn ClientInterface>, ClientError> {
	AlloyClientSchema::validate_config(config)
		.map_err(|e| ClientError::InvalidRequest(format!("Invalid configuration: {}", e)))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ClientError::InvalidRequest("rpc_url is required".to_string()))?;

	Ok(Box::new(AlloyClient::new(rpc_url)?))
}

/// Registry for the HTTP/Alloy client implementation.
pub struct Registry;

impl resolver_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = crate::ClientFactory;

	fn factory() -> Self::Factory {
		create_http_client
	}
}

impl crate::ClientRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_create_http_client_requires_rpc_url() {
		let config: toml::Value = toml::from_str("").unwrap();
		let err = create_http_client(&config).err().unwrap();
		assert!(err.to_string().contains("rpc_url"));
	}

	#[test]
	fn test_create_http_client_rejects_non_http_url() {
		let config: toml::Value = toml::from_str(r#"rpc_url = "ws://localhost:8545""#).unwrap();
		assert!(create_http_client(&config).is_err());
	}

	#[test]
	fn test_create_http_client() {
		let config: toml::Value =
			toml::from_str(r#"rpc_url = "http://localhost:8545""#).unwrap();
		let client = create_http_client(&config).unwrap();
		assert!(client.config_schema().validate(&config).is_ok());
	}
}
