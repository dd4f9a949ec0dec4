//! Builder pattern for constructing resolvers.
//!
//! Composes a Resolver from the client, adapter and batcher implementations
//! named in the configuration, using one factory function per
//! implementation.

use crate::engine::Resolver;
use resolver_adapter::{AdapterError, AdapterService, OracleAdapter};
use resolver_batcher::{BatcherError, BatcherInterface, BatcherService};
use resolver_client::{ClientError, ClientInterface};
use resolver_config::Config;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during resolver construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Container for all factory functions needed to build a Resolver.
///
/// Each factory takes the TOML table of one implementation and returns the
/// implementation, keyed by the name used in the configuration.
pub struct ResolverFactories<CF, AF, BF> {
	pub client_factories: HashMap<String, CF>,
	pub adapter_factories: HashMap<String, AF>,
	pub batcher_factories: HashMap<String, BF>,
}

/// Builder for constructing a Resolver with pluggable implementations.
pub struct ResolverBuilder {
	config: Config,
}

impl ResolverBuilder {
	/// Creates a new ResolverBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the Resolver using factories for each component type.
	pub fn build<CF, AF, BF>(
		self,
		factories: ResolverFactories<CF, AF, BF>,
	) -> Result<Resolver, BuilderError>
	where
		CF: Fn(&toml::Value) -> Result<Box<dyn ClientInterface>, ClientError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn OracleAdapter>, AdapterError>,
		BF: Fn(&toml::Value) -> Result<Box<dyn BatcherInterface>, BatcherError>,
	{
		// Only the primary client is needed; the others are never called.
		let primary_client = &self.config.client.primary;
		let client_config = self
			.config
			.client
			.implementations
			.get(primary_client)
			.ok_or_else(|| {
				BuilderError::MissingComponent(format!("client '{}'", primary_client))
			})?;
		let client_factory = factories.client_factories.get(primary_client).ok_or_else(|| {
			BuilderError::Config(format!("Unknown client implementation '{}'", primary_client))
		})?;
		let client: Arc<dyn ClientInterface> = match client_factory(client_config) {
			Ok(client) => {
				tracing::info!(component = "client", implementation = %primary_client, "Loaded");
				Arc::from(client)
			},
			Err(e) => {
				tracing::error!(
					component = "client",
					implementation = %primary_client,
					error = %e,
					"Failed to create client implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create client implementation '{}': {}",
					primary_client, e
				)));
			},
		};

		// Create adapter instances; several may share one implementation
		let mut adapters = Vec::new();
		for (name, implementation, config) in self.config.adapters.instances() {
			let factory = factories.adapter_factories.get(implementation).ok_or_else(|| {
				BuilderError::Config(format!(
					"Unknown adapter implementation '{}'",
					implementation
				))
			})?;
			match factory(config) {
				Ok(adapter) => {
					tracing::info!(
						component = "adapter",
						instance = %name,
						implementation = %implementation,
						oracle_id = %adapter.oracle_id(),
						"Loaded"
					);
					adapters.push(adapter);
				},
				Err(e) => {
					tracing::error!(
						component = "adapter",
						instance = %name,
						implementation = %implementation,
						error = %e,
						"Failed to create adapter implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create adapter '{}' ({} implementation): {}",
						name, implementation, e
					)));
				},
			}
		}

		if adapters.is_empty() {
			return Err(BuilderError::MissingComponent("oracle adapters".into()));
		}

		let adapters =
			AdapterService::new(adapters).map_err(|e| BuilderError::Config(e.to_string()))?;

		// Create batchers in preference order
		let mut batchers = Vec::new();
		for name in &self.config.batchers.order {
			let factory = factories.batcher_factories.get(name).ok_or_else(|| {
				BuilderError::Config(format!("Unknown batcher implementation '{}'", name))
			})?;
			let config = self.config.batchers.implementations.get(name).ok_or_else(|| {
				BuilderError::MissingComponent(format!("batcher '{}'", name))
			})?;
			match factory(config) {
				Ok(batcher) => {
					tracing::info!(component = "batcher", implementation = %name, "Loaded");
					batchers.push(batcher);
				},
				Err(e) => {
					tracing::error!(
						component = "batcher",
						implementation = %name,
						error = %e,
						"Failed to create batcher implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create batcher implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		if batchers.is_empty() {
			return Err(BuilderError::MissingComponent("batchers".into()));
		}

		Ok(Resolver::new(client, adapters, BatcherService::new(batchers))
			.with_max_iterations(self.config.resolver.max_iterations))
	}
}
