//! LMDB storage backend for the Caves governance engine.
//!
//! Implements the storage traits from `caves-store` using the `heed` LMDB
//! bindings. All logical stores live in a single environment.

pub mod environment;
pub mod error;
pub mod governance;
pub mod meta;
pub mod migration;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use governance::LmdbGovernanceStore;
