//! Core offchain data resolution for ERC-7412 oracle contracts.
//!
//! A call that needs fresh offchain data reverts with `OracleDataRequired`.
//! The `Resolver` catches that revert, fetches the data through the oracle's
//! adapter, and prepends a `fulfillOracleQuery` call to a batched bundle,
//! repeating until the bundle simulates successfully or the attempt bound is
//! reached.

pub mod builder;
pub mod engine;
pub mod error;
pub mod revert;

pub use builder::{BuilderError, ResolverBuilder, ResolverFactories};
pub use engine::{Resolver, DEFAULT_MAX_ITERATIONS};
pub use error::ResolverError;
pub use revert::{classify, classify_error, extract_revert_data};
