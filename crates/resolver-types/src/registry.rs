//! Registry trait for self-registering implementations.
//!
//! Every pluggable implementation (client transports, oracle adapters,
//! batchers) exposes a `Registry` struct implementing this trait so the
//! service can look implementations up by the name used in configuration.

/// Base trait for implementation registries.
///
/// Each implementation module must provide a Registry struct that implements
/// this trait, declaring its configuration name and factory function.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// This should match the key used in the TOML configuration, for example:
	/// - "evm_alloy" for client.implementations.evm_alloy
	/// - "pyth" for adapters.implementations.pyth
	/// - "trusted_multicall_forwarder" for batchers.implementations.trusted_multicall_forwarder
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
