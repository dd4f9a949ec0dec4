//! Oracle adapter module for the offchain data resolver.
//!
//! An oracle adapter turns the opaque query bytes emitted by an oracle
//! contract into the payload that contract's `fulfillOracleQuery` accepts.
//! Oracle contracts announce which adapter understands them through a
//! `bytes32` data-source id; the `AdapterService` maps those ids to adapters.

use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use resolver_client::{ClientError, ClientInterface};
use resolver_types::{
	abi::IERC7412, bytes32_to_string, ImplementationRegistry, OracleQuery, ResolvedPayload,
	Transaction,
};
use std::collections::HashMap;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod default;
	pub mod pyth;
}

/// Errors that can occur while resolving offchain data.
#[derive(Debug, Error)]
pub enum AdapterError {
	/// The data source answered with a non-success HTTP status.
	#[error("error fetching data ({status}): {body}")]
	Http { status: u16, body: String },
	/// The request to the data source could not be completed.
	#[error("Network error: {0}")]
	Network(String),
	/// The data source answered with something that is not a valid payload.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// The oracle query could not be understood by this adapter.
	#[error("Invalid query: {0}")]
	InvalidQuery(String),
	/// No adapter is registered for the id the oracle contract declared.
	#[error("oracle provider {oracle_id} not supported (supported providers: {})", supported.join(","))]
	UnsupportedDataSource {
		oracle_id: String,
		supported: Vec<String>,
	},
	/// Two adapters declared the same id.
	#[error("Duplicate oracle adapter id: {0}")]
	DuplicateOracleId(String),
	/// Reading `oracleId()` from the oracle contract failed.
	#[error("Failed to read oracleId() from {oracle}: {source}")]
	OracleIdLookup {
		oracle: Address,
		#[source]
		source: ClientError,
	},
	/// Error that occurs when configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for oracle adapters.
///
/// An adapter may return fewer payloads than it was given queries, for
/// example when several stale-price queries are refreshed by one update.
/// Every returned payload becomes its own fulfillment call.
#[async_trait]
pub trait OracleAdapter: Send + Sync {
	/// Data-source id this adapter answers for, as declared by oracle contracts.
	fn oracle_id(&self) -> &str;

	/// Resolves all `queries` raised by the oracle contract at `oracle`.
	async fn fetch_offchain_data(
		&self,
		client: &dyn ClientInterface,
		oracle: Address,
		queries: &[OracleQuery],
	) -> Result<Vec<ResolvedPayload>, AdapterError>;
}

/// Type alias for adapter factory functions.
pub type AdapterFactory = fn(&toml::Value) -> Result<Box<dyn OracleAdapter>, AdapterError>;

/// Registry trait for adapter implementations.
pub trait AdapterRegistry: ImplementationRegistry<Factory = AdapterFactory> {}

/// Get all registered adapter implementations.
///
/// Returns a vector of (name, factory) tuples for all available adapter implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AdapterFactory)> {
	use implementations::{default, pyth};

	vec![
		(default::Registry::NAME, default::Registry::factory()),
		(pyth::Registry::NAME, pyth::Registry::factory()),
	]
}

/// Lookup from data-source id to adapter.
///
/// Built once per resolver and read-only afterwards.
pub struct AdapterService {
	adapters: HashMap<String, Box<dyn OracleAdapter>>,
}

impl AdapterService {
	/// Creates a new AdapterService.
	///
	/// Fails with `DuplicateOracleId` if two adapters declare the same id.
	pub fn new(adapters: Vec<Box<dyn OracleAdapter>>) -> Result<Self, AdapterError> {
		let mut by_id = HashMap::with_capacity(adapters.len());
		for adapter in adapters {
			let id = adapter.oracle_id().to_string();
			if by_id.contains_key(&id) {
				return Err(AdapterError::DuplicateOracleId(id));
			}
			by_id.insert(id, adapter);
		}

		Ok(Self { adapters: by_id })
	}

	/// Gets the adapter registered for `oracle_id`.
	pub fn get(&self, oracle_id: &str) -> Option<&dyn OracleAdapter> {
		self.adapters.get(oracle_id).map(|a| a.as_ref())
	}

	/// All registered ids, sorted.
	pub fn supported_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.adapters.keys().cloned().collect();
		ids.sort();
		ids
	}

	/// Gets the adapter for `oracle_id` or an error listing every supported id.
	pub fn adapter(&self, oracle_id: &str) -> Result<&dyn OracleAdapter, AdapterError> {
		self.get(oracle_id)
			.ok_or_else(|| AdapterError::UnsupportedDataSource {
				oracle_id: oracle_id.to_string(),
				supported: self.supported_ids(),
			})
	}

	/// Reads the data-source id declared by the oracle contract at `oracle`.
	pub async fn resolve_oracle_id(
		&self,
		client: &dyn ClientInterface,
		oracle: Address,
	) -> Result<String, AdapterError> {
		let tx = Transaction::call(oracle, IERC7412::oracleIdCall {}.abi_encode());
		let data = client
			.call(&tx)
			.await
			.map_err(|source| AdapterError::OracleIdLookup { oracle, source })?;

		let raw = IERC7412::oracleIdCall::abi_decode_returns(&data).map_err(|e| {
			AdapterError::InvalidResponse(format!("oracleId() of {} returned {}: {}", oracle, data, e))
		})?;

		bytes32_to_string(&raw).map_err(|e| AdapterError::InvalidResponse(e.to_string()))
	}

	/// Resolves `queries` for the oracle contract at `oracle`.
	///
	/// Performs one `oracleId()` read, then hands every query to the matching
	/// adapter in a single call.
	pub async fn fetch_offchain_data(
		&self,
		client: &dyn ClientInterface,
		oracle: Address,
		queries: &[OracleQuery],
	) -> Result<Vec<ResolvedPayload>, AdapterError> {
		let oracle_id = self.resolve_oracle_id(client, oracle).await?;
		let adapter = self.adapter(&oracle_id)?;

		tracing::debug!(
			oracle = %oracle,
			oracle_id = %oracle_id,
			queries = queries.len(),
			"Fetching offchain data"
		);

		let payloads = adapter.fetch_offchain_data(client, oracle, queries).await?;

		tracing::info!(
			oracle = %oracle,
			oracle_id = %oracle_id,
			payloads = payloads.len(),
			"Resolved offchain data"
		);

		Ok(payloads)
	}
}
