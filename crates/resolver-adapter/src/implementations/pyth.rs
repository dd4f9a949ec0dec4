//! Pyth price-feed adapter backed by the Hermes price service.
//!
//! Pyth oracle queries are ABI-encoded as `(uint8 updateType, uint64, ...)`:
//!
//! - update type 1 asks for fresh prices: `(uint8, uint64 stalenessTolerance,
//!   bytes32[] priceIds)`. Every such query raised in one round is answered by
//!   a single combined update.
//! - update type 2 asks for the price at a given time: `(uint8, uint64
//!   requestedTime, bytes32 priceId)`. Each is answered on its own.
//!
//! Both produce a payload of `(uint8, uint64, bytes32[], bytes[] updateData)`.

use crate::{AdapterError, OracleAdapter};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolType};
use async_trait::async_trait;
use base64::prelude::*;
use resolver_client::ClientInterface;
use resolver_types::{
	ConfigSchema, Field, FieldType, OracleQuery, ResolvedPayload, Schema, ValidationError,
};
use serde::{de::DeserializeOwned, Deserialize};

/// Data-source id declared by Pyth oracle contracts.
pub const PYTH_ORACLE_ID: &str = "PYTH";

/// Fee assumed for a query that did not state one. Pyth charges per update,
/// and an underpayment comes back as `FeeRequired`.
const UNKNOWN_UPDATE_FEE: U256 = U256::from_limbs([1, 0, 0, 0]);

const UPDATE_TYPE_STALE: u8 = 1;
const UPDATE_TYPE_AT_TIME: u8 = 2;

sol! {
	/// Query asking for prices no older than `stalenessTolerance` seconds.
	struct StalePriceQuery {
		uint8 updateType;
		uint64 stalenessTolerance;
		bytes32[] priceIds;
	}

	/// Query asking for the price published at `requestedTime`.
	struct PriceAtTimeQuery {
		uint8 updateType;
		uint64 requestedTime;
		bytes32 priceId;
	}

	/// Payload handed back to the oracle's `fulfillOracleQuery`.
	struct PriceUpdatePayload {
		uint8 updateType;
		uint64 timestamp;
		bytes32[] priceIds;
		bytes[] updateData;
	}
}

/// A decoded Pyth oracle query.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PythQuery {
	Stale {
		staleness_tolerance: u64,
		price_ids: Vec<B256>,
		fee: U256,
	},
	AtTime {
		requested_time: u64,
		price_id: B256,
		fee: U256,
	},
}

impl PythQuery {
	fn decode(query: &OracleQuery) -> Result<Self, AdapterError> {
		let data = &query.query;
		if data.len() < 32 {
			return Err(AdapterError::InvalidQuery(format!(
				"pyth query too short: {} bytes",
				data.len()
			)));
		}

		let fee = query.fee.unwrap_or(UNKNOWN_UPDATE_FEE);
		let update_type = U256::from_be_slice(&data[..32]);

		if update_type == U256::from(UPDATE_TYPE_STALE) {
			let decoded = StalePriceQuery::abi_decode_params(data)
				.map_err(|e| AdapterError::InvalidQuery(e.to_string()))?;
			Ok(Self::Stale {
				staleness_tolerance: decoded.stalenessTolerance,
				price_ids: decoded.priceIds,
				fee,
			})
		} else if update_type == U256::from(UPDATE_TYPE_AT_TIME) {
			let decoded = PriceAtTimeQuery::abi_decode_params(data)
				.map_err(|e| AdapterError::InvalidQuery(e.to_string()))?;
			Ok(Self::AtTime {
				requested_time: decoded.requestedTime,
				price_id: decoded.priceId,
				fee,
			})
		} else {
			Err(AdapterError::InvalidQuery(format!(
				"update type {} not supported",
				update_type
			)))
		}
	}
}

#[derive(Debug, Deserialize)]
struct VaaResponse {
	vaa: String,
	#[serde(rename = "publishTime")]
	publish_time: i64,
}

/// Adapter resolving Pyth queries through a Hermes endpoint.
pub struct PythAdapter {
	endpoint: String,
	http: reqwest::Client,
}

impl PythAdapter {
	/// Creates an adapter using the Hermes instance at `endpoint`.
	pub fn new(endpoint: impl Into<String>) -> Self {
		Self {
			endpoint: endpoint.into().trim_end_matches('/').to_string(),
			http: reqwest::Client::new(),
		}
	}

	async fn get_json<T: DeserializeOwned>(
		&self,
		path: &str,
		query: &[(&str, String)],
	) -> Result<T, AdapterError> {
		let url = format!("{}{}", self.endpoint, path);
		let response = self
			.http
			.get(&url)
			.query(query)
			.send()
			.await
			.map_err(|e| AdapterError::Network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = error_body(response.text().await);
			tracing::warn!(url = %url, status = status.as_u16(), "Hermes request failed");
			return Err(AdapterError::Http {
				status: status.as_u16(),
				body,
			});
		}

		response
			.json::<T>()
			.await
			.map_err(|e| AdapterError::InvalidResponse(format!("{}: {}", url, e)))
	}

	/// Latest signed update for every id, in one request.
	async fn latest_update_data(&self, price_ids: &[B256]) -> Result<Vec<Bytes>, AdapterError> {
		let query: Vec<(&str, String)> = price_ids
			.iter()
			.map(|id| ("ids[]", id.to_string()))
			.collect();

		let vaas: Vec<String> = self.get_json("/api/latest_vaas", &query).await?;
		vaas.iter().map(|vaa| decode_vaa(vaa)).collect()
	}

	/// Signed update for `price_id` published at `publish_time`.
	async fn update_data_at(&self, price_id: B256, publish_time: u64) -> Result<Bytes, AdapterError> {
		let response: VaaResponse = self
			.get_json(
				"/api/get_vaa",
				&[
					("id", price_id.to_string()),
					("publish_time", publish_time.to_string()),
				],
			)
			.await?;

		tracing::debug!(
			price_id = %price_id,
			requested_time = publish_time,
			publish_time = response.publish_time,
			"Fetched historical price update"
		);

		decode_vaa(&response.vaa)
	}
}

/// Body of a failed Hermes response. A body that cannot be read is reported
/// in its place so the failure stays visible.
fn error_body(body: Result<String, reqwest::Error>) -> String {
	match body {
		Ok(body) => body,
		Err(e) => {
			tracing::warn!(error = %e, "Failed to read Hermes error body");
			format!("<unreadable body: {}>", e)
		},
	}
}

fn decode_vaa(vaa: &str) -> Result<Bytes, AdapterError> {
	BASE64_STANDARD
		.decode(vaa)
		.map(Bytes::from)
		.map_err(|e| AdapterError::InvalidResponse(format!("VAA is not base64: {}", e)))
}

/// Configuration schema for the Pyth adapter.
pub struct PythAdapterSchema;

impl PythAdapterSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for PythAdapterSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![Field::new("endpoint", FieldType::Url)], vec![]);
		schema.validate(config)
	}
}

#[async_trait]
impl OracleAdapter for PythAdapter {
	fn oracle_id(&self) -> &str {
		PYTH_ORACLE_ID
	}

	async fn fetch_offchain_data(
		&self,
		_client: &dyn ClientInterface,
		oracle: Address,
		queries: &[OracleQuery],
	) -> Result<Vec<ResolvedPayload>, AdapterError> {
		let decoded = queries
			.iter()
			.map(PythQuery::decode)
			.collect::<Result<Vec<_>, _>>()?;

		// Stale-price queries collapse into one update covering every id.
		let mut stale_ids: Vec<B256> = Vec::new();
		let mut stale_tolerance: Option<u64> = None;
		let mut stale_fee = U256::ZERO;
		let mut at_time = Vec::new();

		for query in decoded {
			match query {
				PythQuery::Stale {
					staleness_tolerance,
					price_ids,
					fee,
				} => {
					for id in price_ids {
						if !stale_ids.contains(&id) {
							stale_ids.push(id);
						}
					}
					stale_tolerance = Some(
						stale_tolerance.map_or(staleness_tolerance, |t| t.min(staleness_tolerance)),
					);
					stale_fee = stale_fee.saturating_add(fee);
				},
				PythQuery::AtTime {
					requested_time,
					price_id,
					fee,
				} => at_time.push((requested_time, price_id, fee)),
			}
		}

		let mut payloads = Vec::with_capacity(at_time.len() + 1);

		if let Some(staleness_tolerance) = stale_tolerance {
			let update_data = self.latest_update_data(&stale_ids).await?;
			tracing::debug!(
				oracle = %oracle,
				price_ids = stale_ids.len(),
				staleness_tolerance,
				"Fetched latest price updates"
			);

			let payload = PriceUpdatePayload::abi_encode_params(&PriceUpdatePayload {
				updateType: UPDATE_TYPE_STALE,
				timestamp: staleness_tolerance,
				priceIds: stale_ids,
				updateData: update_data,
			});
			payloads.push(ResolvedPayload {
				payload: payload.into(),
				fee: stale_fee,
			});
		}

		let historical = futures::future::try_join_all(
			at_time
				.iter()
				.map(|&(requested_time, price_id, _)| self.update_data_at(price_id, requested_time)),
		)
		.await?;

		for ((requested_time, price_id, fee), vaa) in at_time.into_iter().zip(historical) {
			let payload = PriceUpdatePayload::abi_encode_params(&PriceUpdatePayload {
				updateType: UPDATE_TYPE_AT_TIME,
				timestamp: requested_time,
				priceIds: vec![price_id],
				updateData: vec![vaa],
			});
			payloads.push(ResolvedPayload {
				payload: payload.into(),
				fee,
			});
		}

		Ok(payloads)
	}
}

/// Factory function to create a Pyth adapter from configuration.
///
/// Required configuration parameters:
/// - `endpoint`: Hermes base URL, e.g. `https://hermes.pyth.network`
pub fn create_adapter(config: &toml::Value) -> Result<Box<dyn OracleAdapter>, AdapterError> {
	PythAdapterSchema::validate_config(config)
		.map_err(|e| AdapterError::Configuration(format!("Invalid configuration: {}", e)))?;

	let endpoint = config
		.get("endpoint")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AdapterError::Configuration("endpoint is required".to_string()))?;

	Ok(Box::new(PythAdapter::new(endpoint)))
}

/// Registry for the Pyth adapter implementation.
pub struct Registry;

impl resolver_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "pyth";
	type Factory = crate::AdapterFactory;

	fn factory() -> Self::Factory {
		create_adapter
	}
}

impl crate::AdapterRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use httpmock::prelude::*;
	use resolver_client::implementations::mock::MockClient;

	fn client() -> MockClient {
		MockClient::new(|_| panic!("pyth adapter must not touch the chain"))
	}

	fn stale_query(staleness: u64, ids: &[B256], fee: Option<u64>) -> OracleQuery {
		OracleQuery {
			query: StalePriceQuery::abi_encode_params(&StalePriceQuery {
				updateType: UPDATE_TYPE_STALE,
				stalenessTolerance: staleness,
				priceIds: ids.to_vec(),
			})
			.into(),
			fee: fee.map(U256::from),
		}
	}

	fn at_time_query(time: u64, id: B256, fee: Option<u64>) -> OracleQuery {
		OracleQuery {
			query: PriceAtTimeQuery::abi_encode_params(&PriceAtTimeQuery {
				updateType: UPDATE_TYPE_AT_TIME,
				requestedTime: time,
				priceId: id,
			})
			.into(),
			fee: fee.map(U256::from),
		}
	}

	fn id(n: u8) -> B256 {
		B256::with_last_byte(n)
	}

	#[tokio::test]
	async fn test_stale_queries_are_coalesced() {
		let server = MockServer::start();
		let mock = server.mock(|when, then| {
			when.method(GET).path("/api/latest_vaas");
			then.status(200).json_body(serde_json::json!(["EjQ="]));
		});

		let adapter = PythAdapter::new(server.base_url());
		let queries = vec![
			stale_query(100, &[id(1), id(2)], Some(10)),
			stale_query(60, &[id(3), id(1)], Some(100)),
			stale_query(100, &[id(4)], None),
		];

		let payloads = adapter
			.fetch_offchain_data(&client(), Address::ZERO, &queries)
			.await
			.unwrap();

		mock.assert();
		assert_eq!(payloads.len(), 1);
		assert_eq!(payloads[0].fee, U256::from(111));

		let payload = PriceUpdatePayload::abi_decode_params(&payloads[0].payload).unwrap();
		assert_eq!(payload.updateType, 1);
		assert_eq!(payload.timestamp, 60);
		assert_eq!(payload.priceIds, vec![id(1), id(2), id(3), id(4)]);
		assert_eq!(payload.updateData, vec![Bytes::from(vec![0x12, 0x34])]);
	}

	#[tokio::test]
	async fn test_price_at_time_queries_resolved_individually() {
		let server = MockServer::start();
		let mock = server.mock(|when, then| {
			when.method(GET)
				.path("/api/get_vaa")
				.query_param("publish_time", "100");
			then.status(200)
				.json_body(serde_json::json!({ "vaa": "QyE=", "publishTime": 100 }));
		});

		let adapter = PythAdapter::new(server.base_url());
		let queries = vec![
			at_time_query(100, id(1), Some(25)),
			at_time_query(100, id(2), Some(150)),
			at_time_query(100, id(3), None),
		];

		let payloads = adapter
			.fetch_offchain_data(&client(), Address::ZERO, &queries)
			.await
			.unwrap();

		mock.assert_hits(3);
		let fees: Vec<U256> = payloads.iter().map(|p| p.fee).collect();
		assert_eq!(
			fees,
			vec![U256::from(25), U256::from(150), U256::from(1)]
		);

		let payload = PriceUpdatePayload::abi_decode_params(&payloads[1].payload).unwrap();
		assert_eq!(payload.updateType, 2);
		assert_eq!(payload.timestamp, 100);
		assert_eq!(payload.priceIds, vec![id(2)]);
		assert_eq!(payload.updateData, vec![Bytes::from(vec![0x43, 0x21])]);
	}

	#[tokio::test]
	async fn test_coalesced_payload_precedes_historical() {
		let server = MockServer::start();
		server.mock(|when, then| {
			when.method(GET).path("/api/latest_vaas");
			then.status(200).json_body(serde_json::json!(["EjQ="]));
		});
		server.mock(|when, then| {
			when.method(GET).path("/api/get_vaa");
			then.status(200)
				.json_body(serde_json::json!({ "vaa": "QyE=", "publishTime": 5 }));
		});

		let adapter = PythAdapter::new(server.base_url());
		let queries = vec![
			at_time_query(5, id(9), Some(7)),
			stale_query(30, &[id(1)], Some(3)),
		];

		let payloads = adapter
			.fetch_offchain_data(&client(), Address::ZERO, &queries)
			.await
			.unwrap();

		assert_eq!(payloads.len(), 2);
		assert_eq!(payloads[0].fee, U256::from(3));
		assert_eq!(payloads[1].fee, U256::from(7));
	}

	#[tokio::test]
	async fn test_unsupported_update_type() {
		let adapter = PythAdapter::new("http://127.0.0.1:1");
		let queries = vec![
			at_time_query(100, id(1), Some(25)),
			OracleQuery {
				query: Bytes::from(U256::from(3).to_be_bytes::<32>()),
				fee: Some(U256::from(150)),
			},
		];

		let err = adapter
			.fetch_offchain_data(&client(), Address::ZERO, &queries)
			.await
			.unwrap_err();

		assert_eq!(err.to_string(), "Invalid query: update type 3 not supported");
	}

	#[tokio::test]
	async fn test_hermes_error_status() {
		let server = MockServer::start();
		server.mock(|when, then| {
			when.method(GET).path("/api/latest_vaas");
			then.status(404).body("Price ids not found");
		});

		let adapter = PythAdapter::new(server.base_url());
		let err = adapter
			.fetch_offchain_data(
				&client(),
				Address::ZERO,
				&[stale_query(60, &[id(1)], None)],
			)
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			AdapterError::Http { status: 404, ref body } if body == "Price ids not found"
		));
	}

	#[tokio::test]
	async fn test_unreadable_error_body_is_reported() {
		let read_error = reqwest::get("http://127.0.0.1:1").await.unwrap_err();
		let message = read_error.to_string();

		let body = error_body(Err(read_error));
		assert!(body.starts_with("<unreadable body: "));
		assert!(body.contains(&message));
		assert!(!body.is_empty());

		assert_eq!(error_body(Ok("Price ids not found".to_string())), "Price ids not found");
	}

	#[test]
	fn test_factory() {
		let config: toml::Value =
			toml::from_str(r#"endpoint = "https://hermes.pyth.network/""#).unwrap();
		let adapter = create_adapter(&config).unwrap();
		assert_eq!(adapter.oracle_id(), "PYTH");

		let empty: toml::Value = toml::from_str("").unwrap();
		assert!(create_adapter(&empty).is_err());
	}
}
