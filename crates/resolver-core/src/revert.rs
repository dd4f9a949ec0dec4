//! Revert classification.
//!
//! Turns the error of a failed simulation into a `RevertOutcome`. Revert data
//! is looked up along the error's `source()` chain, at most
//! `MAX_CAUSE_DEPTH` levels deep. At each level two places are searched:
//!
//! 1. the `data` of a `ClientError::Reverted`
//! 2. the `data` member of a JSON-RPC error response, whether reached as a
//!    `ClientError::Transport` or as a bare `TransportError`
//!
//! When several levels carry data the deepest one is used.

use alloy_primitives::Bytes;
use alloy_sol_types::{SolError, SolInterface};
use alloy_transport::TransportError;
use resolver_client::ClientError;
use resolver_types::{
	abi::{IERC7412, IERC7412Legacy},
	truncate_hex, RevertOutcome,
};
use std::error::Error;

/// Deepest `source()` level inspected for revert data.
pub const MAX_CAUSE_DEPTH: usize = 8;

/// Finds the revert data carried by `err` or one of its causes.
pub fn extract_revert_data(err: &(dyn Error + 'static)) -> Option<Bytes> {
	let mut found = None;
	let mut current = Some(err);

	for _ in 0..MAX_CAUSE_DEPTH {
		let Some(level) = current else {
			break;
		};
		if let Some(data) = revert_data_at(level) {
			found = Some(data);
		}
		current = level.source();
	}

	found
}

fn revert_data_at(err: &(dyn Error + 'static)) -> Option<Bytes> {
	if let Some(client_err) = err.downcast_ref::<ClientError>() {
		return client_err.revert_data();
	}
	if let Some(transport_err) = err.downcast_ref::<TransportError>() {
		return transport_err
			.as_error_resp()
			.and_then(|payload| payload.as_revert_data());
	}
	None
}

/// Decodes revert data against the known structured errors.
///
/// The current ABI is tried first, then the legacy two-argument
/// `OracleDataRequired`. `Errors(bytes[])` entries are classified
/// recursively.
pub fn classify(data: &[u8]) -> RevertOutcome {
	if let Ok(err) = IERC7412::IERC7412Errors::abi_decode(data) {
		return match err {
			IERC7412::IERC7412Errors::OracleDataRequired(e) => RevertOutcome::OracleDataRequired {
				oracle: e.oracleContract,
				query: e.oracleQuery,
				fee: Some(e.feeRequired),
			},
			IERC7412::IERC7412Errors::FeeRequired(e) => RevertOutcome::FeeRequired { fee: e.feeAmount },
			IERC7412::IERC7412Errors::Errors(e) => {
				RevertOutcome::Errors(e.errors.iter().map(|inner| classify(inner)).collect())
			},
		};
	}

	if let Ok(e) = IERC7412Legacy::OracleDataRequired::abi_decode(data) {
		return RevertOutcome::OracleDataRequired {
			oracle: e.oracleContract,
			query: e.oracleQuery,
			fee: None,
		};
	}

	RevertOutcome::Unrecognized(Bytes::copy_from_slice(data))
}

/// Classifies the error of a failed simulation.
///
/// An error without revert data is `Unrecognized` with empty data.
pub fn classify_error(err: &ClientError) -> RevertOutcome {
	match extract_revert_data(err) {
		Some(data) => {
			let outcome = classify(&data);
			tracing::debug!(
				revert = %truncate_hex(&data.to_string(), 8),
				recognized = outcome.is_recognized(),
				"Classified revert"
			);
			outcome
		},
		None => RevertOutcome::Unrecognized(Bytes::new()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_json_rpc::ErrorPayload;
	use alloy_primitives::{address, bytes, Address, U256};
	use std::fmt;

	const ORACLE: Address = address!("0x2345234523452345234523452345234523452345");

	fn oracle_data_required(query: Bytes, fee: u64) -> Bytes {
		IERC7412::OracleDataRequired {
			oracleContract: ORACLE,
			oracleQuery: query,
			feeRequired: U256::from(fee),
		}
		.abi_encode()
		.into()
	}

	fn rpc_error(data: &Bytes) -> TransportError {
		TransportError::ErrorResp(ErrorPayload {
			code: 3,
			message: "execution reverted".into(),
			data: Some(serde_json::value::to_raw_value(&data.to_string()).unwrap()),
		})
	}

	/// Error wrapping another, standing in for layers added by callers.
	#[derive(Debug)]
	struct Wrapped(Box<dyn Error + 'static>);

	impl fmt::Display for Wrapped {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			write!(f, "wrapped: {}", self.0)
		}
	}

	impl Error for Wrapped {
		fn source(&self) -> Option<&(dyn Error + 'static)> {
			Some(self.0.as_ref())
		}
	}

	#[test]
	fn test_classify_current_oracle_data_required() {
		let outcome = classify(&oracle_data_required(bytes!("1234"), 100));
		assert_eq!(
			outcome,
			RevertOutcome::OracleDataRequired {
				oracle: ORACLE,
				query: bytes!("1234"),
				fee: Some(U256::from(100)),
			}
		);
	}

	#[test]
	fn test_classify_legacy_oracle_data_required() {
		let data = IERC7412Legacy::OracleDataRequired {
			oracleContract: ORACLE,
			oracleQuery: bytes!("1234"),
		}
		.abi_encode();

		assert_eq!(
			classify(&data),
			RevertOutcome::OracleDataRequired {
				oracle: ORACLE,
				query: bytes!("1234"),
				fee: None,
			}
		);
	}

	#[test]
	fn test_classify_fee_required() {
		let data = IERC7412::FeeRequired {
			feeAmount: U256::from(7),
		}
		.abi_encode();
		assert_eq!(
			classify(&data),
			RevertOutcome::FeeRequired {
				fee: U256::from(7)
			}
		);
	}

	#[test]
	fn test_classify_errors_recursively() {
		let first = oracle_data_required(bytes!("01"), 1);
		let second = bytes!("08c379a0");
		let nested = Bytes::from(
			IERC7412::Errors {
				errors: vec![oracle_data_required(bytes!("02"), 2)],
			}
			.abi_encode(),
		);
		let data = IERC7412::Errors {
			errors: vec![first.clone(), second.clone(), nested.clone()],
		}
		.abi_encode();

		assert_eq!(
			classify(&data),
			RevertOutcome::Errors(vec![classify(&first), classify(&second), classify(&nested)])
		);
		assert_eq!(classify(&second), RevertOutcome::Unrecognized(second));
	}

	#[test]
	fn test_unknown_selector_is_unrecognized() {
		assert_eq!(
			classify(&bytes!("08273020")),
			RevertOutcome::Unrecognized(bytes!("08273020"))
		);
		assert_eq!(classify(&[]), RevertOutcome::Unrecognized(Bytes::new()));
	}

	#[test]
	fn test_extract_from_rpc_error_response() {
		let data = oracle_data_required(bytes!("1234"), 0);
		let err = ClientError::Transport(rpc_error(&data));
		assert_eq!(extract_revert_data(&err), Some(data));
	}

	#[test]
	fn test_extract_from_nested_causes() {
		let data = oracle_data_required(bytes!("1234"), 0);
		let err = Wrapped(Box::new(Wrapped(Box::new(ClientError::Reverted {
			data: data.clone(),
		}))));
		assert_eq!(extract_revert_data(&err), Some(data));
	}

	#[test]
	fn test_depth_is_bounded() {
		let data = oracle_data_required(bytes!("1234"), 0);
		let mut err: Box<dyn Error + 'static> = Box::new(ClientError::Reverted { data });
		for _ in 0..MAX_CAUSE_DEPTH {
			err = Box::new(Wrapped(err));
		}
		assert_eq!(extract_revert_data(err.as_ref()), None);
	}

	#[test]
	fn test_classify_error_without_data() {
		let err = ClientError::InvalidRequest("0x08273020".into());
		assert_eq!(classify_error(&err), RevertOutcome::Unrecognized(Bytes::new()));
	}
}
