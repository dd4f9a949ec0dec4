//! Configuration module for the offchain data resolver.
//!
//! This module provides structures and utilities for managing resolver configuration.
//! It supports loading configuration from TOML files, substitutes `${VAR}` and
//! `${VAR:-default}` environment references before parsing, and validates that
//! every section references implementations that are actually configured.
//!
//! Implementation tables are kept as raw `toml::Value`s; each implementation
//! validates its own table through its `ConfigSchema` when it is built.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the resolver.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Settings of the resolution loop itself.
	#[serde(default)]
	pub resolver: ResolverConfig,
	/// Chain access used for every simulated call.
	pub client: ClientConfig,
	/// Oracle adapters, keyed by instance name.
	pub adapters: AdaptersConfig,
	/// Batching strategies and the order in which they are tried.
	#[serde(default)]
	pub batchers: BatchersConfig,
}

/// Settings of the resolution loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
	/// Maximum number of simulations attempted before giving up.
	/// Defaults to 5 if not specified.
	#[serde(default = "default_max_iterations")]
	pub max_iterations: u32,
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			max_iterations: default_max_iterations(),
		}
	}
}

/// Returns the default number of resolution attempts.
fn default_max_iterations() -> u32 {
	5
}

/// Configuration for chain access.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of client implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for oracle adapters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdaptersConfig {
	/// Map of adapter instance names to their configurations.
	/// Each implementation has its own configuration format stored as raw TOML values.
	pub implementations: HashMap<String, toml::Value>,
}

/// Key of an adapter table naming the implementation that serves it.
pub const ADAPTER_IMPLEMENTATION_KEY: &str = "implementation";

impl AdaptersConfig {
	/// Configured adapter instances as `(instance, implementation, table)`.
	///
	/// A table may pick its implementation with an `implementation` key, so one
	/// implementation can back several instances. Without it the table name is
	/// the implementation name.
	pub fn instances(&self) -> impl Iterator<Item = (&str, &str, &toml::Value)> + '_ {
		self.implementations.iter().map(|(name, config)| {
			let implementation = config
				.get(ADAPTER_IMPLEMENTATION_KEY)
				.and_then(|v| v.as_str())
				.unwrap_or(name);
			(name.as_str(), implementation, config)
		})
	}
}

/// Configuration for batching strategies.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchersConfig {
	/// Implementation names in priority order. The first one able to batch a
	/// bundle is used.
	pub order: Vec<String>,
	/// Map of batcher implementation names to their configurations.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

/// Name of the batcher used when none is configured.
pub const DEFAULT_BATCHER: &str = "trusted_multicall_forwarder";

impl Default for BatchersConfig {
	fn default() -> Self {
		Self {
			order: vec![DEFAULT_BATCHER.to_string()],
			implementations: HashMap::from([(
				DEFAULT_BATCHER.to_string(),
				toml::Value::Table(toml::Table::new()),
			)]),
		}
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;

		content.parse()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - `resolver.max_iterations` is at least 1
	/// - the primary client has an implementation table
	/// - at least one adapter is configured, and any `implementation` key is a
	///   non-empty string
	/// - the batcher order is non-empty, free of repeats, and every entry has
	///   an implementation table
	fn validate(&self) -> Result<(), ConfigError> {
		if self.resolver.max_iterations == 0 {
			return Err(ConfigError::Validation(
				"resolver.max_iterations must be at least 1".into(),
			));
		}

		// Validate client config
		if self.client.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Client primary implementation cannot be empty".into(),
			));
		}
		if !self.client.implementations.contains_key(&self.client.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary client '{}' not found in implementations",
				self.client.primary
			)));
		}

		// Validate adapters config
		if self.adapters.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one oracle adapter must be configured".into(),
			));
		}
		for (name, config) in &self.adapters.implementations {
			if let Some(implementation) = config.get(ADAPTER_IMPLEMENTATION_KEY) {
				if implementation.as_str().map_or(true, str::is_empty) {
					return Err(ConfigError::Validation(format!(
						"Adapter '{}': implementation must be a non-empty string",
						name
					)));
				}
			}
		}

		// Validate batchers config
		if self.batchers.order.is_empty() {
			return Err(ConfigError::Validation(
				"batchers.order must name at least one batcher".into(),
			));
		}
		for (i, name) in self.batchers.order.iter().enumerate() {
			if self.batchers.order[..i].contains(name) {
				return Err(ConfigError::Validation(format!(
					"Batcher '{}' appears more than once in batchers.order",
					name
				)));
			}
			if !self.batchers.implementations.contains_key(name) {
				return Err(ConfigError::Validation(format!(
					"Batcher '{}' listed in batchers.order has no implementation table",
					name
				)));
			}
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
