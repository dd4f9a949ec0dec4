//! Smart-account batcher for Biconomy-style accounts.
//!
//! Bundles are executed by the sender's own smart account through
//! `executeBatch(dest[], value[], func[])`. The account is the sender of
//! every sub-call, so targets need no forwarder support. `executeBatch`
//! returns nothing, so per-call results cannot be recovered from a
//! simulation of the bundle.

use crate::{distinct, BatcherError, BatcherInterface, SupportCache};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use resolver_client::ClientInterface;
use resolver_types::{
	abi::ISmartAccount, ConfigSchema, Schema, Transaction, ValidationError,
};

/// Batcher executing bundles through the sender's smart account.
#[derive(Default)]
pub struct BiconomyBatcher {
	support: SupportCache,
}

impl BiconomyBatcher {
	/// Creates a new BiconomyBatcher.
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether `account` accepts a no-op `executeBatch`.
	async fn is_smart_account(
		&self,
		client: &dyn ClientInterface,
		account: Address,
	) -> Result<bool, BatcherError> {
		self.support
			.get_or_probe(account, || async move {
				let probe = Transaction::call(
					account,
					ISmartAccount::executeBatchCall {
						dest: vec![Address::ZERO],
						value: vec![U256::ZERO],
						func: vec![Bytes::new()],
					}
					.abi_encode(),
				);

				match client.call(&probe).await {
					Ok(_) => Ok(true),
					Err(e) if e.is_execution_error() => Ok(false),
					Err(e) => Err(e),
				}
			})
			.await
			.map_err(|source| BatcherError::Probe {
				address: account,
				source,
			})
	}
}

/// Configuration schema for the Biconomy batcher. It takes no options.
pub struct BiconomySchema;

impl BiconomySchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for BiconomySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl BatcherInterface for BiconomyBatcher {
	fn name(&self) -> &str {
		"biconomy"
	}

	async fn batchable(
		&self,
		client: &dyn ClientInterface,
		txs: &[Transaction],
	) -> Result<bool, BatcherError> {
		// Every call needs a sender that is itself a smart account.
		if txs.iter().any(|tx| tx.from.is_none()) {
			return Ok(false);
		}

		for account in distinct(txs.iter().filter_map(|tx| tx.from)) {
			if !self.is_smart_account(client, account).await? {
				tracing::debug!(account = %account, "Sender is not a smart account");
				return Ok(false);
			}
		}

		Ok(true)
	}

	fn batch(&self, txs: &[Transaction]) -> Result<Transaction, BatcherError> {
		let last = txs.last().ok_or(BatcherError::EmptyBundle)?;
		let account = last.from.ok_or_else(|| {
			BatcherError::Configuration("smart account batching requires a sender".into())
		})?;

		let call = ISmartAccount::executeBatchCall {
			dest: txs.iter().map(Transaction::to_or_zero).collect(),
			value: txs.iter().map(Transaction::value_or_zero).collect(),
			func: txs.iter().map(Transaction::data_or_empty).collect(),
		};
		let total = txs
			.iter()
			.fold(U256::ZERO, |acc, tx| acc.saturating_add(tx.value_or_zero()));

		Ok(Transaction {
			from: None,
			to: Some(account),
			data: Some(call.abi_encode().into()),
			value: Some(total),
		})
	}

	fn decode_results(&self, _data: &Bytes) -> Result<Vec<Bytes>, BatcherError> {
		Err(BatcherError::ReturnDataUnavailable(self.name().to_string()))
	}
}

/// Factory function to create a Biconomy batcher from configuration.
pub fn create_batcher(config: &toml::Value) -> Result<Box<dyn BatcherInterface>, BatcherError> {
	BiconomySchema::validate_config(config)
		.map_err(|e| BatcherError::Configuration(format!("Invalid configuration: {}", e)))?;

	Ok(Box::new(BiconomyBatcher::new()))
}

/// Registry for the Biconomy batcher.
pub struct Registry;

impl resolver_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "biconomy";
	type Factory = crate::BatcherFactory;

	fn factory() -> Self::Factory {
		create_batcher
	}
}

impl crate::BatcherRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, bytes};
	use resolver_client::{implementations::mock::MockClient, ClientError};

	const ACCOUNT: Address = address!("0x5555555555555555555555555555555555555555");
	const TARGET: Address = address!("0x1234123412341234123412341234123412341234");

	#[test]
	fn test_batch_sends_execute_batch_to_account() {
		let batcher = BiconomyBatcher::new();
		let txs = vec![
			Transaction::call(TARGET, bytes!("01"))
				.with_from(ACCOUNT)
				.with_value(U256::from(3)),
			Transaction::call(TARGET, bytes!("02")).with_from(ACCOUNT),
		];

		let tx = batcher.batch(&txs).unwrap();
		assert_eq!(tx.to, Some(ACCOUNT));
		assert_eq!(tx.value, Some(U256::from(3)));

		let call = ISmartAccount::executeBatchCall::abi_decode(&tx.data.unwrap()).unwrap();
		assert_eq!(call.dest, vec![TARGET, TARGET]);
		assert_eq!(call.value, vec![U256::from(3), U256::ZERO]);
		assert_eq!(call.func, vec![bytes!("01"), bytes!("02")]);
	}

	#[tokio::test]
	async fn test_batchable_requires_smart_account_senders() {
		let client = MockClient::new(|tx| {
			if tx.to == Some(ACCOUNT) {
				Ok(Bytes::new())
			} else {
				Err(ClientError::Reverted { data: Bytes::new() })
			}
		});
		let batcher = BiconomyBatcher::new();

		let from_account = vec![Transaction::call(TARGET, bytes!("01")).with_from(ACCOUNT)];
		assert!(batcher.batchable(&client, &from_account).await.unwrap());

		let from_eoa = vec![Transaction::call(TARGET, bytes!("01")).with_from(TARGET)];
		assert!(!batcher.batchable(&client, &from_eoa).await.unwrap());

		let anonymous = vec![Transaction::call(TARGET, bytes!("01"))];
		assert!(!batcher.batchable(&client, &anonymous).await.unwrap());

		// One probe each for ACCOUNT and TARGET
		assert_eq!(client.calls().len(), 2);
	}

	#[test]
	fn test_results_unavailable() {
		let batcher = BiconomyBatcher::new();
		assert!(matches!(
			batcher.decode_results(&Bytes::new()),
			Err(BatcherError::ReturnDataUnavailable(name)) if name == "biconomy"
		));
	}
}
