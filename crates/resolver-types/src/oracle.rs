//! Oracle query and revert outcome types.
//!
//! These types carry offchain data demands from a reverted simulation to an
//! oracle adapter and back. Query and payload bytes are opaque here; only the
//! adapter that owns a data source knows their layout.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// One outstanding demand for offchain data, addressed to an oracle contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleQuery {
	/// Query bytes as emitted by the oracle contract.
	pub query: Bytes,
	/// Fee the contract already announced for this query, if any.
	pub fee: Option<U256>,
}

impl OracleQuery {
	/// Known fee, or zero when none was announced.
	pub fn fee_or_zero(&self) -> U256 {
		self.fee.unwrap_or(U256::ZERO)
	}
}

/// An adapter's answer to one or more queries.
///
/// `fee` may aggregate the fees of several queries resolved together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPayload {
	/// Bytes to pass to `fulfillOracleQuery`.
	pub payload: Bytes,
	/// Value to attach to the fulfillment call.
	pub fee: U256,
}

/// Classified cause of a failed simulated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertOutcome {
	/// Revert data that matches none of the known structured errors.
	Unrecognized(Bytes),
	/// The oracle contract needs offchain data before the call can succeed.
	OracleDataRequired {
		oracle: Address,
		query: Bytes,
		/// `None` when decoded from the legacy two-argument form.
		fee: Option<U256>,
	},
	/// The most recent fulfillment needs this fee attached.
	FeeRequired { fee: U256 },
	/// Several sub-calls reverted; each entry is classified independently.
	Errors(Vec<RevertOutcome>),
}

impl RevertOutcome {
	/// Flattens nested `Errors` aggregates depth-first, preserving order.
	pub fn flatten(self) -> Vec<RevertOutcome> {
		let mut out = Vec::new();
		self.flatten_into(&mut out);
		out
	}

	fn flatten_into(self, out: &mut Vec<RevertOutcome>) {
		match self {
			RevertOutcome::Errors(inner) => {
				for outcome in inner {
					outcome.flatten_into(out);
				}
			},
			other => out.push(other),
		}
	}

	/// Returns false if this outcome, or any outcome nested in it, is unrecognized.
	pub fn is_recognized(&self) -> bool {
		match self {
			RevertOutcome::Unrecognized(_) => false,
			RevertOutcome::Errors(inner) => inner.iter().all(RevertOutcome::is_recognized),
			_ => true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, bytes};

	fn oracle_required(query: Bytes) -> RevertOutcome {
		RevertOutcome::OracleDataRequired {
			oracle: address!("0x2345234523452345234523452345234523452345"),
			query,
			fee: None,
		}
	}

	#[test]
	fn test_flatten_nested_errors_preserves_order() {
		let outcome = RevertOutcome::Errors(vec![
			oracle_required(bytes!("01")),
			RevertOutcome::Errors(vec![
				oracle_required(bytes!("02")),
				RevertOutcome::FeeRequired {
					fee: U256::from(5),
				},
			]),
			oracle_required(bytes!("03")),
		]);

		let flat = outcome.flatten();
		assert_eq!(
			flat,
			vec![
				oracle_required(bytes!("01")),
				oracle_required(bytes!("02")),
				RevertOutcome::FeeRequired {
					fee: U256::from(5)
				},
				oracle_required(bytes!("03")),
			]
		);
	}

	#[test]
	fn test_is_recognized_looks_inside_aggregates() {
		assert!(oracle_required(bytes!("01")).is_recognized());
		assert!(!RevertOutcome::Unrecognized(bytes!("deadbeef")).is_recognized());

		let nested = RevertOutcome::Errors(vec![
			oracle_required(bytes!("01")),
			RevertOutcome::Errors(vec![RevertOutcome::Unrecognized(Bytes::new())]),
		]);
		assert!(!nested.is_recognized());
	}

	#[test]
	fn test_query_fee_defaults_to_zero() {
		let query = OracleQuery {
			query: bytes!("1234"),
			fee: None,
		};
		assert_eq!(query.fee_or_zero(), U256::ZERO);
	}
}
