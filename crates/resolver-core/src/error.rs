//! Errors surfaced by the resolution loop.

use alloy_primitives::Address;
use resolver_adapter::AdapterError;
use resolver_batcher::BatcherError;
use resolver_client::ClientError;
use thiserror::Error;

/// Errors that can occur while resolving offchain data for a call.
///
/// Only `OracleDataRequired` and `FeeRequired` reverts are handled by the
/// loop; every other condition ends resolution with one of these.
#[derive(Debug, Error)]
pub enum ResolverError {
	/// The simulated call failed for a reason the loop does not handle. Holds
	/// the client error exactly as the client returned it.
	#[error(transparent)]
	UnrecognizedRevert(ClientError),
	/// An oracle contract declared a data-source id with no registered adapter.
	#[error("oracle provider {oracle_id} not supported (supported providers: {})", supported.join(","))]
	UnsupportedDataSource {
		oracle_id: String,
		supported: Vec<String>,
	},
	/// No batching strategy supports every call in the bundle.
	#[error("No compatible batcher for targets [{}]", targets.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", "))]
	NoCompatibleBatcher { targets: Vec<Address> },
	/// Offchain data was still being demanded after the last allowed attempt.
	#[error("offchain data resolution retries exceeded ({attempts} attempts)")]
	RetryBoundExceeded { attempts: u32 },
	/// The bundle simulated successfully but returned no data.
	#[error("simulated call succeeded without return data")]
	MissingReturnData,
	/// An oracle adapter failed to produce a payload.
	#[error("offchain data fetch failed: {0}")]
	AdapterFetchFailure(#[source] AdapterError),
	/// A batching strategy failed.
	#[error("Batcher error: {0}")]
	Batcher(#[source] BatcherError),
	/// Reading the data-source id of an oracle contract failed.
	#[error("Failed to read oracleId() from {oracle}: {source}")]
	OracleIdLookup {
		oracle: Address,
		#[source]
		source: ClientError,
	},
	/// No calls were given.
	#[error("at least one transaction is required")]
	EmptyRequest,
}

impl ResolverError {
	/// Recovers the original client error of an unrecognized revert.
	pub fn into_client_error(self) -> Result<ClientError, Self> {
		match self {
			ResolverError::UnrecognizedRevert(err) => Ok(err),
			other => Err(other),
		}
	}
}

impl From<AdapterError> for ResolverError {
	fn from(err: AdapterError) -> Self {
		match err {
			AdapterError::UnsupportedDataSource {
				oracle_id,
				supported,
			} => ResolverError::UnsupportedDataSource {
				oracle_id,
				supported,
			},
			AdapterError::OracleIdLookup { oracle, source } => {
				ResolverError::OracleIdLookup { oracle, source }
			},
			other => ResolverError::AdapterFetchFailure(other),
		}
	}
}

impl From<BatcherError> for ResolverError {
	fn from(err: BatcherError) -> Self {
		match err {
			BatcherError::NoCompatibleBatcher { targets } => {
				ResolverError::NoCompatibleBatcher { targets }
			},
			other => ResolverError::Batcher(other),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_retry_bound_message_is_matchable() {
		let err = ResolverError::RetryBoundExceeded { attempts: 5 };
		assert!(err
			.to_string()
			.starts_with("offchain data resolution retries exceeded"));
	}

	#[test]
	fn test_unrecognized_revert_is_transparent() {
		let err = ResolverError::UnrecognizedRevert(ClientError::InvalidRequest("0x08273020".into()));
		assert_eq!(err.to_string(), "Invalid request: 0x08273020");
		assert!(matches!(
			err.into_client_error(),
			Ok(ClientError::InvalidRequest(msg)) if msg == "0x08273020"
		));
	}

	#[test]
	fn test_adapter_errors_are_mapped() {
		let unsupported: ResolverError = AdapterError::UnsupportedDataSource {
			oracle_id: "FAKER".into(),
			supported: vec!["FAKE".into()],
		}
		.into();
		assert_eq!(
			unsupported.to_string(),
			"oracle provider FAKER not supported (supported providers: FAKE)"
		);

		let http: ResolverError = AdapterError::Http {
			status: 500,
			body: "boom".into(),
		}
		.into();
		assert!(matches!(http, ResolverError::AdapterFetchFailure(AdapterError::Http { status: 500, .. })));
	}

	#[test]
	fn test_oracle_id_lookup_keeps_oracle_address() {
		let oracle = Address::repeat_byte(0x23);
		let err: ResolverError = AdapterError::OracleIdLookup {
			oracle,
			source: ClientError::InvalidRequest("execution reverted".into()),
		}
		.into();

		assert!(matches!(
			err,
			ResolverError::OracleIdLookup { oracle: o, .. } if o == oracle
		));
		assert!(err.to_string().contains(&oracle.to_string()));
		assert!(err.to_string().contains("execution reverted"));
		assert!(std::error::Error::source(&err).is_some());
	}
}
