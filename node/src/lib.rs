//! Caves node: configuration, logging and storage wiring around the
//! governance engine.

pub mod config;
pub mod error;
pub mod logging;
pub mod node;

pub use config::{NodeConfig, StorageBackend, TokenConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::{log_events, CavesNode};
