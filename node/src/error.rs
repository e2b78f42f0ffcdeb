use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("governance error: {0}")]
    Governance(#[from] caves_governance::GovernanceError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] caves_store_lmdb::LmdbError),

    #[error("config error: {0}")]
    Config(String),

    #[error("logging error: {0}")]
    Logging(String),
}
