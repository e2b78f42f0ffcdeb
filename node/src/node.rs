//! `CavesNode`: wires the governance engine to its store and token ledger.

use std::sync::Arc;

use caves_governance::{Caves, EventSubscription};
use caves_store::GovernanceStore;
use caves_store_lmdb::LmdbEnvironment;
use caves_token::{TokenLedger, WikiToken};
use caves_types::AccountId;
use tokio::sync::broadcast::error::RecvError;

use crate::config::{NodeConfig, StorageBackend};
use crate::NodeError;

pub struct CavesNode<L: TokenLedger> {
    config: NodeConfig,
    engine: Caves<L>,
    env: Option<LmdbEnvironment>,
}

impl<L: TokenLedger> CavesNode<L> {
    /// Open the node's storage and restore the engine from it.
    pub fn open(config: NodeConfig, ledger: L) -> Result<Self, NodeError> {
        let account = config.engine_account()?;
        let capacity = config.event_channel_capacity;

        let (engine, env) = match config.storage {
            StorageBackend::Memory => {
                tracing::info!(account = %account, "starting node with in-memory storage");
                (Caves::with_capacity(account, ledger, capacity), None)
            }
            StorageBackend::Lmdb => {
                let env = LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size)?;
                tracing::info!(path = %env.path().display(), account = %account, "starting node with LMDB storage");
                let store: Arc<dyn GovernanceStore> = Arc::new(env.governance_store());
                let engine = Caves::open(account, ledger, store, capacity)?;
                (engine, Some(env))
            }
        };

        Ok(Self {
            config,
            engine,
            env,
        })
    }

    pub fn engine(&self) -> &Caves<L> {
        &self.engine
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn is_persistent(&self) -> bool {
        self.env.is_some()
    }
}

impl CavesNode<Arc<WikiToken>> {
    /// Open a node backed by a fresh [`WikiToken`] built from `config.token`.
    pub fn open_with_token(config: NodeConfig) -> Result<Self, NodeError> {
        let owner = AccountId::parse(&config.token.owner)
            .map_err(|e| NodeError::Config(format!("token.owner: {e}")))?;
        let token = Arc::new(WikiToken::new(owner, config.token.initial_supply));
        Self::open(config, token)
    }

    pub fn token(&self) -> &Arc<WikiToken> {
        self.engine.ledger()
    }
}

/// Log every event from `events` as JSON until the engine is dropped.
///
/// Returns the number of records logged.
pub async fn log_events(mut events: EventSubscription) -> u64 {
    let mut logged = 0;
    loop {
        match events.recv().await {
            Ok(record) => {
                tracing::info!(target: "caves_events", event = %record.to_json(), "event");
                logged += 1;
            }
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "event observer lagged");
            }
            Err(RecvError::Closed) => return logged,
        }
    }
}
