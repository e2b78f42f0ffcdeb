//! Nullable infrastructure for deterministic testing.
//!
//! Storage is abstracted behind the `caves-store` traits. This crate
//! provides a test-friendly implementation that:
//! - Never touches the filesystem
//! - Can be told to fail commits, to exercise rollback paths
//!
//! Usage: swap the LMDB backend for [`NullStore`] in tests.

pub mod store;

pub use store::NullStore;
