//! Transaction request type for the resolution loop.
//!
//! A `Transaction` is a plain value describing one call or transfer. The
//! resolver copies these freely: corrective transactions are prepended to a
//! working list and the caller's own list is never modified in place.

use alloy_primitives::{Address, Bytes, U256};
use alloy_rpc_types::TransactionRequest;
use serde::{Deserialize, Serialize};

/// A single call or transfer.
///
/// Every field is optional, matching what a JSON-RPC `eth_call` accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Sender of the call.
	pub from: Option<Address>,
	/// Target contract or recipient.
	pub to: Option<Address>,
	/// Calldata.
	pub data: Option<Bytes>,
	/// Native value attached to the call, in wei.
	pub value: Option<U256>,
}

impl Transaction {
	/// Creates a call to `to` carrying `data`.
	pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			to: Some(to),
			data: Some(data.into()),
			..Default::default()
		}
	}

	/// Sets the sender.
	pub fn with_from(mut self, from: Address) -> Self {
		self.from = Some(from);
		self
	}

	/// Sets the attached value.
	pub fn with_value(mut self, value: U256) -> Self {
		self.value = Some(value);
		self
	}

	/// Attached value, treating an absent value as zero.
	pub fn value_or_zero(&self) -> U256 {
		self.value.unwrap_or(U256::ZERO)
	}

	/// Calldata, treating absent calldata as empty.
	pub fn data_or_empty(&self) -> Bytes {
		self.data.clone().unwrap_or_default()
	}

	/// Target address, treating an absent target as the zero address.
	pub fn to_or_zero(&self) -> Address {
		self.to.unwrap_or(Address::ZERO)
	}
}

impl From<Transaction> for TransactionRequest {
	fn from(tx: Transaction) -> Self {
		let mut request = TransactionRequest::default();
		if let Some(from) = tx.from {
			request = request.from(from);
		}
		if let Some(to) = tx.to {
			request = request.to(to);
		}
		if let Some(data) = tx.data {
			request = request.input(data.into());
		}
		if let Some(value) = tx.value {
			request = request.value(value);
		}
		request
	}
}
