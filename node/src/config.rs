//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use caves_types::AccountId;

use crate::logging::LogFormat;
use crate::NodeError;

/// Where DAO state and the event log live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One LMDB environment under `data_dir`.
    Lmdb,
    /// Nothing persisted; state is lost when the node is dropped.
    Memory,
}

/// The in-process token ledger the node creates when it is not handed one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Receives the whole initial supply and both token roles.
    #[serde(default = "default_token_owner")]
    pub owner: String,

    #[serde(default)]
    pub initial_supply: u64,
}

/// Configuration for a Caves node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_storage")]
    pub storage: StorageBackend,

    /// LMDB map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Account the engine escrows stake into.
    #[serde(default = "default_engine_account")]
    pub engine_account: String,

    /// Buffer of the live event broadcast channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Log output format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter (e.g. "info", "debug,caves_governance=trace").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub token: TokenConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_storage() -> StorageBackend {
    StorageBackend::Lmdb
}

fn default_lmdb_map_size() -> usize {
    caves_store_lmdb::environment::DEFAULT_MAP_SIZE
}

fn default_engine_account() -> String {
    "caves".to_string()
}

fn default_event_channel_capacity() -> usize {
    caves_governance::DEFAULT_CHANNEL_CAPACITY
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_owner() -> String {
    "deployer".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// An in-memory configuration, handy for tests and embedding.
    pub fn in_memory() -> Self {
        Self {
            storage: StorageBackend::Memory,
            ..Self::default()
        }
    }

    pub fn engine_account(&self) -> Result<AccountId, NodeError> {
        AccountId::parse(&self.engine_account)
            .map_err(|e| NodeError::Config(format!("engine_account: {e}")))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            owner: default_token_owner(),
            initial_supply: 0,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: default_storage(),
            lmdb_map_size: default_lmdb_map_size(),
            engine_account: default_engine_account(),
            event_channel_capacity: default_event_channel_capacity(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            token: TokenConfig::default(),
        }
    }
}
