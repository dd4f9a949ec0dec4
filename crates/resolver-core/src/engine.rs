//! The resolution loop.
//!
//! Each attempt simulates the caller's calls with every corrective
//! fulfillment gathered so far placed ahead of them. A revert asking for
//! oracle data adds fulfillments; a revert asking for a fee adjusts the last
//! one. Anything else ends resolution with the original error.

use crate::error::ResolverError;
use crate::revert::classify_error;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use resolver_adapter::AdapterService;
use resolver_batcher::{BatcherInterface, BatcherService};
use resolver_client::{ClientError, ClientInterface};
use resolver_types::{
	abi::IERC7412, OracleQuery, ResolvedPayload, RevertOutcome, Transaction,
};
use std::sync::Arc;

/// Attempts made before giving up, unless configured otherwise.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Offchain data resolver for one chain.
pub struct Resolver {
	client: Arc<dyn ClientInterface>,
	adapters: AdapterService,
	batchers: BatcherService,
	max_iterations: u32,
}

/// A bundle that simulated successfully.
struct Simulated<'a> {
	/// Transaction that was simulated.
	bundle: Transaction,
	/// Strategy that assembled `bundle`, `None` when a single call was sent as is.
	batcher: Option<&'a dyn BatcherInterface>,
	/// Return data of the simulation.
	data: Bytes,
}

impl Resolver {
	/// Creates a new Resolver.
	pub fn new(
		client: Arc<dyn ClientInterface>,
		adapters: AdapterService,
		batchers: BatcherService,
	) -> Self {
		Self {
			client,
			adapters,
			batchers,
			max_iterations: DEFAULT_MAX_ITERATIONS,
		}
	}

	/// Sets the number of simulations attempted before giving up. At least
	/// one attempt is always made.
	pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
		self.max_iterations = max_iterations.max(1);
		self
	}

	/// Simulates `txs` as one atomic bundle, resolving offchain data demands
	/// along the way, and returns the return data of each call in `txs`.
	pub async fn call_with_offchain_data(
		&self,
		txs: &[Transaction],
	) -> Result<Vec<Bytes>, ResolverError> {
		let simulated = self.simulate(txs).await?;

		let Some(batcher) = simulated.batcher else {
			return Ok(vec![simulated.data]);
		};

		let mut results = batcher.decode_results(&simulated.data)?;
		let Some(first_original) = results.len().checked_sub(txs.len()) else {
			return Err(ResolverError::Batcher(resolver_batcher::BatcherError::Decode(
				format!(
					"bundle returned {} results for {} calls",
					results.len(),
					txs.len()
				),
			)));
		};

		Ok(results.split_off(first_original))
	}

	/// Runs the same loop as `call_with_offchain_data` and returns the bundle
	/// that simulated successfully, ready to be signed and sent.
	pub async fn prepare_transaction(
		&self,
		txs: &[Transaction],
	) -> Result<Transaction, ResolverError> {
		Ok(self.simulate(txs).await?.bundle)
	}

	/// Builds the fulfillment transactions answering the revert in `err`.
	///
	/// `FeeRequired` cannot be answered without a fulfillment to attach the
	/// fee to, so on its own it is returned as an unrecognized revert.
	pub async fn resolve_prepend_transactions(
		&self,
		err: ClientError,
	) -> Result<Vec<Transaction>, ResolverError> {
		let mut prepended = Vec::new();
		self.handle_revert(err, &mut prepended).await?;
		Ok(prepended)
	}

	async fn simulate(&self, originals: &[Transaction]) -> Result<Simulated<'_>, ResolverError> {
		if originals.is_empty() {
			return Err(ResolverError::EmptyRequest);
		}

		let mut prepended: Vec<Transaction> = Vec::new();

		for attempt in 1..=self.max_iterations {
			let combined: Vec<Transaction> =
				prepended.iter().chain(originals).cloned().collect();

			let (bundle, batcher) = match combined.as_slice() {
				[single] => (single.clone(), None),
				_ => {
					let batcher = self.batchers.select(self.client.as_ref(), &combined).await?;
					(batcher.batch(&combined)?, Some(batcher))
				},
			};

			tracing::debug!(
				attempt,
				calls = combined.len(),
				corrective = prepended.len(),
				batcher = batcher.map(|b| b.name()).unwrap_or("none"),
				"Simulating bundle"
			);

			match self.client.call(&bundle).await {
				Ok(data) if data.is_empty() => return Err(ResolverError::MissingReturnData),
				Ok(data) => {
					tracing::info!(
						attempt,
						corrective = prepended.len(),
						"Bundle simulated successfully"
					);
					return Ok(Simulated {
						bundle,
						batcher,
						data,
					});
				},
				Err(err) => self.handle_revert(err, &mut prepended).await?,
			}
		}

		tracing::warn!(
			attempts = self.max_iterations,
			corrective = prepended.len(),
			"Offchain data still required after last attempt"
		);
		Err(ResolverError::RetryBoundExceeded {
			attempts: self.max_iterations,
		})
	}

	/// Applies the revert in `err` to `prepended`, or returns `err` untouched
	/// if it is not an offchain data demand.
	async fn handle_revert(
		&self,
		err: ClientError,
		prepended: &mut Vec<Transaction>,
	) -> Result<(), ResolverError> {
		let outcomes = classify_error(&err).flatten();

		if outcomes.is_empty() || outcomes.iter().any(|o| !o.is_recognized()) {
			tracing::warn!(error = %err, "Unrecognized revert, propagating");
			return Err(ResolverError::UnrecognizedRevert(err));
		}

		let mut requests: Vec<(Address, Vec<OracleQuery>)> = Vec::new();
		let mut required_fee: Option<U256> = None;

		for outcome in outcomes {
			match outcome {
				RevertOutcome::OracleDataRequired { oracle, query, fee } => {
					let query = OracleQuery { query, fee };
					match requests.iter_mut().find(|(addr, _)| *addr == oracle) {
						Some((_, queries)) => queries.push(query),
						None => requests.push((oracle, vec![query])),
					}
				},
				RevertOutcome::FeeRequired { fee } => required_fee = Some(fee),
				// Flattened and checked above
				RevertOutcome::Unrecognized(_) | RevertOutcome::Errors(_) => {},
			}
		}

		if let Some(fee) = required_fee {
			let Some(last) = prepended.last_mut() else {
				tracing::warn!(fee = %fee, "Fee required with no fulfillment to attach it to");
				return Err(ResolverError::UnrecognizedRevert(err));
			};
			tracing::info!(oracle = ?last.to, fee = %fee, "Raising fulfillment fee");
			last.value = Some(fee);
		}

		if !requests.is_empty() {
			let fulfillments = self.fulfillments(&requests).await?;
			tracing::info!(
				oracles = requests.len(),
				fulfillments = fulfillments.len(),
				"Prepending fulfillments"
			);
			prepended.extend(fulfillments);
		}

		Ok(())
	}

	/// Resolves every oracle's queries concurrently, keeping the order in
	/// which the oracles first appeared.
	async fn fulfillments(
		&self,
		requests: &[(Address, Vec<OracleQuery>)],
	) -> Result<Vec<Transaction>, ResolverError> {
		let client = self.client.as_ref();

		let resolved = futures::future::try_join_all(requests.iter().map(
			|(oracle, queries)| async move {
				let payloads = self
					.adapters
					.fetch_offchain_data(client, *oracle, queries)
					.await?;
				Ok::<_, ResolverError>(
					payloads
						.into_iter()
						.map(|payload| fulfillment(*oracle, payload))
						.collect::<Vec<_>>(),
				)
			},
		))
		.await?;

		Ok(resolved.into_iter().flatten().collect())
	}
}

/// The `fulfillOracleQuery` call delivering `payload` to `oracle`.
fn fulfillment(oracle: Address, payload: ResolvedPayload) -> Transaction {
	Transaction::call(
		oracle,
		IERC7412::fulfillOracleQueryCall {
			signedOffchainData: payload.payload,
		}
		.abi_encode(),
	)
	.with_value(payload.fee)
}
