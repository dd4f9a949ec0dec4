//! Per-address capability cache shared by batching strategies.

use alloy_primitives::Address;
use dashmap::DashMap;
use resolver_client::ClientError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Read-through cache of whether an address supports a batching mechanism.
///
/// Concurrent lookups of the same address share a single in-flight probe.
/// A probe that fails without an answer leaves the entry empty so the next
/// lookup probes again. Answers are kept for the lifetime of the cache; an
/// address whose capability changes later (e.g. an upgraded proxy) keeps
/// its first answer.
#[derive(Debug, Default)]
pub struct SupportCache {
	entries: DashMap<Address, Arc<OnceCell<bool>>>,
}

impl SupportCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the cached answer for `address`, running `probe` if there is none.
	pub async fn get_or_probe<F, Fut>(&self, address: Address, probe: F) -> Result<bool, ClientError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<bool, ClientError>>,
	{
		// Clone the cell out so the map shard is not locked across the probe.
		let cell = {
			let entry = self.entries.entry(address).or_default();
			Arc::clone(entry.value())
		};

		cell.get_or_try_init(probe).await.copied()
	}

	/// Cached answer for `address`, if one has been recorded.
	pub fn cached(&self, address: &Address) -> Option<bool> {
		self.entries
			.get(address)
			.and_then(|cell| cell.get().copied())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	const ADDR: Address = address!("0x1234123412341234123412341234123412341234");

	#[tokio::test]
	async fn test_answer_is_cached() {
		let cache = SupportCache::new();
		let probes = AtomicUsize::new(0);

		for _ in 0..3 {
			let supported = cache
				.get_or_probe(ADDR, || async {
					probes.fetch_add(1, Ordering::SeqCst);
					Ok::<_, ClientError>(false)
				})
				.await
				.unwrap();
			assert!(!supported);
		}

		assert_eq!(probes.load(Ordering::SeqCst), 1);
		assert_eq!(cache.cached(&ADDR), Some(false));
	}

	#[tokio::test]
	async fn test_concurrent_lookups_share_one_probe() {
		let cache = SupportCache::new();
		let probes = AtomicUsize::new(0);

		let lookup = || {
			cache.get_or_probe(ADDR, || async {
				probes.fetch_add(1, Ordering::SeqCst);
				tokio::time::sleep(Duration::from_millis(20)).await;
				Ok::<_, ClientError>(true)
			})
		};

		let results = futures::future::join_all((0..8).map(|_| lookup())).await;

		assert!(results.into_iter().all(|r| r.unwrap()));
		assert_eq!(probes.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_failed_probe_is_not_cached() {
		let cache = SupportCache::new();

		let err = cache
			.get_or_probe(ADDR, || async {
				Err::<bool, _>(ClientError::InvalidRequest("connection refused".into()))
			})
			.await;
		assert!(err.is_err());
		assert_eq!(cache.cached(&ADDR), None);

		let supported = cache
			.get_or_probe(ADDR, || async { Ok::<_, ClientError>(true) })
			.await
			.unwrap();
		assert!(supported);
	}
}
