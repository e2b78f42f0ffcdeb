use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// An event sequence number that is already in the log.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored key or value that cannot be decoded.
    #[error("database is corrupted: {0}")]
    Corruption(String),
}
