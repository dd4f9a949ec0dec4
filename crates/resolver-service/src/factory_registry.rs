//! Dynamic factory registry for resolver implementations.
//!
//! Collects the factory of every client, adapter and batcher implementation
//! so that configuration can refer to them by name.

use resolver_adapter::AdapterFactory;
use resolver_batcher::BatcherFactory;
use resolver_client::ClientFactory;
use resolver_config::Config;
use resolver_core::{Resolver, ResolverBuilder, ResolverFactories};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub client: HashMap<String, ClientFactory>,
	pub adapter: HashMap<String, AdapterFactory>,
	pub batcher: HashMap<String, BatcherFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			client: HashMap::new(),
			adapter: HashMap::new(),
			batcher: HashMap::new(),
		}
	}

	/// Register a client implementation
	pub fn register_client(&mut self, name: impl Into<String>, factory: ClientFactory) {
		self.client.insert(name.into(), factory);
	}

	/// Register an oracle adapter implementation
	pub fn register_adapter(&mut self, name: impl Into<String>, factory: AdapterFactory) {
		self.adapter.insert(name.into(), factory);
	}

	/// Register a batcher implementation
	pub fn register_batcher(&mut self, name: impl Into<String>, factory: BatcherFactory) {
		self.batcher.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Get the global factory registry, registering every implementation on first use
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in resolver_client::get_all_implementations() {
			tracing::debug!("Registering client implementation: {}", name);
			registry.register_client(name, factory);
		}

		for (name, factory) in resolver_adapter::get_all_implementations() {
			tracing::debug!("Registering adapter implementation: {}", name);
			registry.register_adapter(name, factory);
		}

		for (name, factory) in resolver_batcher::get_all_implementations() {
			tracing::debug!("Registering batcher implementation: {}", name);
			registry.register_batcher(name, factory);
		}

		registry
	})
}

/// Macro to build factories from the implementation names a config uses
macro_rules! build_factories {
	($registry:expr, $names:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $names {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.to_string(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Build a resolver using the registry and config
pub fn build_resolver_from_config(config: Config) -> Result<Resolver, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let factories = ResolverFactories {
		client_factories: build_factories!(
			registry,
			config.client.implementations.keys().map(String::as_str),
			client,
			"client"
		),
		adapter_factories: build_factories!(
			registry,
			config
				.adapters
				.instances()
				.map(|(_, implementation, _)| implementation),
			adapter,
			"adapter"
		),
		batcher_factories: build_factories!(
			registry,
			config.batchers.implementations.keys().map(String::as_str),
			batcher,
			"batcher"
		),
	};

	Ok(ResolverBuilder::new(config).build(factories)?)
}
