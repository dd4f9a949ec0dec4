//! Trusted multicall forwarder batcher.
//!
//! Wraps every call of a bundle into one `aggregate3Value` call on an
//! ERC-2771 multicall forwarder. Every sub-call is sent with
//! `requireSuccess = true`, so a single failing sub-call reverts the whole
//! bundle with that sub-call's revert data. Targets must declare the
//! forwarder trusted, otherwise they would see the forwarder instead of the
//! original sender.

use crate::{distinct, BatcherError, BatcherInterface, SupportCache};
use alloy_primitives::{address, Address, Bytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use resolver_client::ClientInterface;
use resolver_types::{
	abi::{
		IERC2771Context,
		ITrustedMulticallForwarder::{self, Call3Value},
	},
	ConfigSchema, Field, FieldType, Schema, Transaction, ValidationError,
};

/// Canonical deployment address of the trusted multicall forwarder.
pub const DEFAULT_FORWARDER_ADDRESS: Address =
	address!("0xE2C5658cC5C448B48141168f3e475dF8f65A1e3e");

/// Batcher sending bundles through a trusted multicall forwarder.
pub struct TrustedMulticallForwarderBatcher {
	forwarder: Address,
	support: SupportCache,
}

impl Default for TrustedMulticallForwarderBatcher {
	fn default() -> Self {
		Self::new(DEFAULT_FORWARDER_ADDRESS)
	}
}

impl TrustedMulticallForwarderBatcher {
	/// Creates a batcher using the forwarder deployed at `forwarder`.
	pub fn new(forwarder: Address) -> Self {
		Self {
			forwarder,
			support: SupportCache::new(),
		}
	}

	/// Whether `target` trusts the forwarder.
	///
	/// A target that reverts or returns something other than a boolean, such
	/// as an EOA or a contract without ERC-2771 support, does not.
	async fn trusts_forwarder(
		&self,
		client: &dyn ClientInterface,
		target: Address,
	) -> Result<bool, BatcherError> {
		let forwarder = self.forwarder;
		self.support
			.get_or_probe(target, || async move {
				let probe = Transaction::call(
					target,
					IERC2771Context::isTrustedForwarderCall { forwarder }.abi_encode(),
				);

				match client.call(&probe).await {
					Ok(data) => {
						Ok(IERC2771Context::isTrustedForwarderCall::abi_decode_returns(&data)
							.unwrap_or(false))
					},
					Err(e) if e.is_execution_error() => Ok(false),
					Err(e) => Err(e),
				}
			})
			.await
			.map_err(|source| BatcherError::Probe {
				address: target,
				source,
			})
	}
}

/// Configuration schema for the trusted multicall forwarder batcher.
pub struct TrustedMulticallForwarderSchema;

impl TrustedMulticallForwarderSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for TrustedMulticallForwarderSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("forwarder_address", FieldType::Address)],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl BatcherInterface for TrustedMulticallForwarderBatcher {
	fn name(&self) -> &str {
		"trusted_multicall_forwarder"
	}

	async fn batchable(
		&self,
		client: &dyn ClientInterface,
		txs: &[Transaction],
	) -> Result<bool, BatcherError> {
		for target in distinct(txs.iter().map(Transaction::to_or_zero)) {
			if !self.trusts_forwarder(client, target).await? {
				tracing::debug!(
					target = %target,
					forwarder = %self.forwarder,
					"Target does not trust forwarder"
				);
				return Ok(false);
			}
		}

		Ok(true)
	}

	fn batch(&self, txs: &[Transaction]) -> Result<Transaction, BatcherError> {
		let last = txs.last().ok_or(BatcherError::EmptyBundle)?;

		let calls: Vec<Call3Value> = txs
			.iter()
			.map(|tx| Call3Value {
				target: tx.to_or_zero(),
				requireSuccess: true,
				value: tx.value_or_zero(),
				callData: tx.data_or_empty(),
			})
			.collect();
		let total = txs
			.iter()
			.fold(U256::ZERO, |acc, tx| acc.saturating_add(tx.value_or_zero()));

		Ok(Transaction {
			from: last.from,
			to: Some(self.forwarder),
			data: Some(ITrustedMulticallForwarder::aggregate3ValueCall { calls }.abi_encode().into()),
			value: Some(total),
		})
	}

	fn decode_results(&self, data: &Bytes) -> Result<Vec<Bytes>, BatcherError> {
		let results = ITrustedMulticallForwarder::aggregate3ValueCall::abi_decode_returns(data)
			.map_err(|e| BatcherError::Decode(e.to_string()))?;

		results
			.into_iter()
			.enumerate()
			.map(|(i, result)| {
				if result.success {
					Ok(result.returnData)
				} else {
					Err(BatcherError::Decode(format!("sub-call {} reported failure", i)))
				}
			})
			.collect()
	}
}

/// Factory function to create a forwarder batcher from configuration.
///
/// Configuration parameters:
/// - `forwarder_address`: forwarder deployment (optional, defaults to the
///   canonical deployment)
pub fn create_batcher(config: &toml::Value) -> Result<Box<dyn BatcherInterface>, BatcherError> {
	TrustedMulticallForwarderSchema::validate_config(config)
		.map_err(|e| BatcherError::Configuration(format!("Invalid configuration: {}", e)))?;

	let forwarder = match config.get("forwarder_address").and_then(|v| v.as_str()) {
		Some(raw) => raw
			.parse::<Address>()
			.map_err(|e| BatcherError::Configuration(format!("Invalid forwarder_address: {}", e)))?,
		None => DEFAULT_FORWARDER_ADDRESS,
	};

	Ok(Box::new(TrustedMulticallForwarderBatcher::new(forwarder)))
}

/// Registry for the trusted multicall forwarder batcher.
pub struct Registry;

impl resolver_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "trusted_multicall_forwarder";
	type Factory = crate::BatcherFactory;

	fn factory() -> Self::Factory {
		create_batcher
	}
}

impl crate::BatcherRegistry for Registry {}
