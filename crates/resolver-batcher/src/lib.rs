//! Batching strategies for the offchain data resolver.
//!
//! A batcher merges the corrective fulfillment calls and the caller's
//! original calls into one atomic transaction. Strategies are tried in the
//! configured order; the first one able to batch every call in the bundle
//! is used.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use resolver_client::{ClientError, ClientInterface};
use resolver_types::{ImplementationRegistry, Transaction};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod biconomy;
	pub mod trusted_multicall_forwarder;
}

mod support;

pub use support::SupportCache;

/// Errors that can occur while batching calls.
#[derive(Debug, Error)]
pub enum BatcherError {
	/// None of the configured strategies supports every call in the bundle.
	#[error("No compatible batcher for targets [{}]", format_addresses(targets))]
	NoCompatibleBatcher { targets: Vec<Address> },
	/// Nothing to batch.
	#[error("Cannot batch an empty list of transactions")]
	EmptyBundle,
	/// The strategy does not expose per-call return data.
	#[error("Batcher {0} does not return per-call results")]
	ReturnDataUnavailable(String),
	/// The bundle's return data could not be decoded.
	#[error("Failed to decode batch results: {0}")]
	Decode(String),
	/// Probing an address for support failed before the node executed the call.
	#[error("Support probe of {address} failed: {source}")]
	Probe {
		address: Address,
		#[source]
		source: ClientError,
	},
	/// Error that occurs when configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

fn format_addresses(addresses: &[Address]) -> String {
	addresses
		.iter()
		.map(|a| a.to_string())
		.collect::<Vec<_>>()
		.join(", ")
}

/// Trait defining the interface for batching strategies.
#[async_trait]
pub trait BatcherInterface: Send + Sync {
	/// Implementation name, used in logs and errors.
	fn name(&self) -> &str;

	/// Whether every call in `txs` can go through this strategy.
	///
	/// Per-address answers are cached for the lifetime of the batcher.
	async fn batchable(
		&self,
		client: &dyn ClientInterface,
		txs: &[Transaction],
	) -> Result<bool, BatcherError>;

	/// Merges `txs` into one transaction.
	///
	/// The value is the sum of all values and the last transaction is taken
	/// as the caller-originated one.
	fn batch(&self, txs: &[Transaction]) -> Result<Transaction, BatcherError>;

	/// Splits the return data of a batched call into per-call return data,
	/// in bundle order.
	fn decode_results(&self, data: &Bytes) -> Result<Vec<Bytes>, BatcherError>;
}

/// Type alias for batcher factory functions.
pub type BatcherFactory = fn(&toml::Value) -> Result<Box<dyn BatcherInterface>, BatcherError>;

/// Registry trait for batcher implementations.
pub trait BatcherRegistry: ImplementationRegistry<Factory = BatcherFactory> {}

/// Get all registered batcher implementations.
///
/// Returns a vector of (name, factory) tuples for all available batcher implementations.
pub fn get_all_implementations() -> Vec<(&'static str, BatcherFactory)> {
	use implementations::{biconomy, trusted_multicall_forwarder};

	vec![
		(
			trusted_multicall_forwarder::Registry::NAME,
			trusted_multicall_forwarder::Registry::factory(),
		),
		(biconomy::Registry::NAME, biconomy::Registry::factory()),
	]
}

/// Ordered set of batching strategies.
pub struct BatcherService {
	batchers: Vec<Box<dyn BatcherInterface>>,
}

impl BatcherService {
	/// Creates a new BatcherService trying `batchers` in the given order.
	pub fn new(batchers: Vec<Box<dyn BatcherInterface>>) -> Self {
		Self { batchers }
	}

	/// Names of the configured strategies, in priority order.
	pub fn names(&self) -> Vec<&str> {
		self.batchers.iter().map(|b| b.name()).collect()
	}

	/// Returns the first strategy able to batch `txs`.
	pub async fn select(
		&self,
		client: &dyn ClientInterface,
		txs: &[Transaction],
	) -> Result<&dyn BatcherInterface, BatcherError> {
		for batcher in &self.batchers {
			if batcher.batchable(client, txs).await? {
				tracing::debug!(batcher = %batcher.name(), calls = txs.len(), "Selected batcher");
				return Ok(batcher.as_ref());
			}
		}

		let targets = distinct(txs.iter().map(Transaction::to_or_zero));

		tracing::warn!(
			batchers = ?self.names(),
			targets = %format_addresses(&targets),
			"No batcher supports bundle"
		);
		Err(BatcherError::NoCompatibleBatcher { targets })
	}
}

/// Addresses in `addresses`, without repeats, in first-appearance order.
pub(crate) fn distinct(addresses: impl IntoIterator<Item = Address>) -> Vec<Address> {
	let mut seen = Vec::new();
	for address in addresses {
		if !seen.contains(&address) {
			seen.push(address);
		}
	}
	seen
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, bytes};
	use resolver_client::implementations::mock::MockClient;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	struct FixedBatcher {
		name: &'static str,
		supported: bool,
		asked: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl BatcherInterface for FixedBatcher {
		fn name(&self) -> &str {
			self.name
		}

		async fn batchable(
			&self,
			_client: &dyn ClientInterface,
			_txs: &[Transaction],
		) -> Result<bool, BatcherError> {
			self.asked.fetch_add(1, Ordering::SeqCst);
			Ok(self.supported)
		}

		fn batch(&self, txs: &[Transaction]) -> Result<Transaction, BatcherError> {
			txs.last().cloned().ok_or(BatcherError::EmptyBundle)
		}

		fn decode_results(&self, _data: &Bytes) -> Result<Vec<Bytes>, BatcherError> {
			Ok(vec![])
		}
	}

	fn fixed(name: &'static str, supported: bool) -> (Box<dyn BatcherInterface>, Arc<AtomicUsize>) {
		let asked = Arc::new(AtomicUsize::new(0));
		(
			Box::new(FixedBatcher {
				name,
				supported,
				asked: asked.clone(),
			}),
			asked,
		)
	}

	fn txs() -> Vec<Transaction> {
		let target = address!("0x1234123412341234123412341234123412341234");
		vec![
			Transaction::call(address!("0x2345234523452345234523452345234523452345"), bytes!("01")),
			Transaction::call(target, bytes!("12345678")),
			Transaction::call(target, bytes!("9abc")),
		]
	}

	#[tokio::test]
	async fn test_first_batchable_wins() {
		let (no, no_asked) = fixed("no", false);
		let (first, _) = fixed("first", true);
		let (second, second_asked) = fixed("second", true);
		let service = BatcherService::new(vec![no, first, second]);
		let client = MockClient::new(|_| Ok(Bytes::new()));

		let selected = service.select(&client, &txs()).await.unwrap();
		assert_eq!(selected.name(), "first");
		assert_eq!(no_asked.load(Ordering::SeqCst), 1);
		assert_eq!(second_asked.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_no_compatible_batcher_lists_distinct_targets() {
		let (no, _) = fixed("no", false);
		let service = BatcherService::new(vec![no]);
		let client = MockClient::new(|_| Ok(Bytes::new()));

		let err = service.select(&client, &txs()).await.err().unwrap();
		match err {
			BatcherError::NoCompatibleBatcher { targets } => assert_eq!(
				targets,
				vec![
					address!("0x2345234523452345234523452345234523452345"),
					address!("0x1234123412341234123412341234123412341234"),
				]
			),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn test_distinct_keeps_first_appearance() {
		let a = address!("0x000000000000000000000000000000000000000a");
		let b = address!("0x000000000000000000000000000000000000000b");
		assert_eq!(distinct([b, a, b, a]), vec![b, a]);
	}

	#[test]
	fn test_registered_implementations() {
		let names: Vec<&str> = get_all_implementations().iter().map(|(n, _)| *n).collect();
		assert_eq!(names, vec!["trusted_multicall_forwarder", "biconomy"]);
	}
}
