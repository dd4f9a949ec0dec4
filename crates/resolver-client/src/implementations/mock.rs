//! Scripted client for tests.
//!
//! Answers every simulated call from a closure and records the requests it
//! saw, so tests can assert on exactly what the resolver sent.

use crate::{ClientError, ClientInterface};
use alloy_primitives::Bytes;
use async_trait::async_trait;
use resolver_types::{ConfigSchema, Schema, Transaction, ValidationError};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&Transaction) -> Result<Bytes, ClientError> + Send + Sync>;

/// Client whose responses are produced by a closure.
pub struct MockClient {
	responder: Responder,
	calls: Mutex<Vec<Transaction>>,
}

impl MockClient {
	/// Creates a client answering with `responder`.
	pub fn new<F>(responder: F) -> Self
	where
		F: Fn(&Transaction) -> Result<Bytes, ClientError> + Send + Sync + 'static,
	{
		Self {
			responder: Box::new(responder),
			calls: Mutex::new(Vec::new()),
		}
	}

	/// Every request received so far, in order.
	pub fn calls(&self) -> Vec<Transaction> {
		self.calls
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone()
	}
}

struct MockClientSchema;

impl ConfigSchema for MockClientSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl ClientInterface for MockClient {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockClientSchema)
	}

	async fn call(&self, tx: &Transaction) -> Result<Bytes, ClientError> {
		self.calls
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.push(tx.clone());
		(self.responder)(tx)
	}
}
