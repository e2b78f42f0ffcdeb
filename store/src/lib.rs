//! Abstract storage traits for the Caves governance engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. Payloads are opaque bytes; the engine owns the encoding.

pub mod batch;
pub mod dao;
pub mod error;
pub mod event;
pub mod record;

pub use batch::{GovernanceStore, WriteBatch};
pub use dao::DaoStore;
pub use error::StoreError;
pub use event::EventStore;
pub use record::{RecordKey, RecordKind};
