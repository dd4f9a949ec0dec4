//! Generic HTTP oracle adapter.
//!
//! Forwards the raw oracle query to a fixed URL and uses the response body
//! as the fulfillment payload. The query is POSTed as a 0x-prefixed hex
//! string with `Content-Type: text/plain`, and the service answers with the
//! payload in the same encoding.

use crate::{AdapterError, OracleAdapter};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use resolver_client::ClientInterface;
use resolver_types::{
	truncate_hex, ConfigSchema, Field, FieldType, OracleQuery, ResolvedPayload, Schema,
	ValidationError,
};

/// Adapter that resolves queries through a single HTTP endpoint.
pub struct DefaultAdapter {
	oracle_id: String,
	url: String,
	http: reqwest::Client,
}

impl DefaultAdapter {
	/// Creates an adapter answering for `oracle_id` by POSTing to `url`.
	pub fn new(oracle_id: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			oracle_id: oracle_id.into(),
			url: url.into(),
			http: reqwest::Client::new(),
		}
	}
}

/// Configuration schema for the default adapter.
pub struct DefaultAdapterSchema;

impl DefaultAdapterSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for DefaultAdapterSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("oracle_id", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(id) if id.is_empty() => Err("oracle_id must not be empty".to_string()),
						Some(id) if id.len() > 32 => {
							Err(format!("oracle_id '{}' does not fit in bytes32", id))
						},
						_ => Ok(()),
					}
				}),
				Field::new("url", FieldType::Url),
			],
			vec![],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl OracleAdapter for DefaultAdapter {
	fn oracle_id(&self) -> &str {
		&self.oracle_id
	}

	async fn fetch_offchain_data(
		&self,
		_client: &dyn ClientInterface,
		oracle: Address,
		queries: &[OracleQuery],
	) -> Result<Vec<ResolvedPayload>, AdapterError> {
		let [query] = queries else {
			return Err(AdapterError::InvalidQuery(format!(
				"only one query at a time is supported, got {}",
				queries.len()
			)));
		};

		let response = self
			.http
			.post(&self.url)
			.header(reqwest::header::CONTENT_TYPE, "text/plain")
			.body(query.query.to_string())
			.send()
			.await
			.map_err(|e| AdapterError::Network(e.to_string()))?;

		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| AdapterError::Network(e.to_string()))?;

		if !status.is_success() {
			tracing::warn!(
				oracle = %oracle,
				url = %self.url,
				status = status.as_u16(),
				"Oracle data source rejected query"
			);
			return Err(AdapterError::Http {
				status: status.as_u16(),
				body,
			});
		}

		let payload: Bytes = body.trim().parse().map_err(|e| {
			AdapterError::InvalidResponse(format!(
				"{} is not hex: {}",
				truncate_hex(body.trim(), 16),
				e
			))
		})?;

		Ok(vec![ResolvedPayload {
			payload,
			fee: query.fee_or_zero(),
		}])
	}
}

/// Factory function to create a default adapter from configuration.
///
/// Required configuration parameters:
/// - `oracle_id`: data-source id this adapter answers for
/// - `url`: endpoint receiving the POSTed query
pub fn create_adapter(config: &toml::Value) -> Result<Box<dyn OracleAdapter>, AdapterError> {
	DefaultAdapterSchema::validate_config(config)
		.map_err(|e| AdapterError::Configuration(format!("Invalid configuration: {}", e)))?;

	let oracle_id = config
		.get("oracle_id")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AdapterError::Configuration("oracle_id is required".to_string()))?;
	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AdapterError::Configuration("url is required".to_string()))?;

	Ok(Box::new(DefaultAdapter::new(oracle_id, url)))
}

/// Registry for the default adapter implementation.
pub struct Registry;

impl resolver_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "default";
	type Factory = crate::AdapterFactory;

	fn factory() -> Self::Factory {
		create_adapter
	}
}

impl crate::AdapterRegistry for Registry {}
