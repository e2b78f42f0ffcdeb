use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("corrupted entry: {0}")]
    Corruption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<LmdbError> for caves_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Duplicate(key) => caves_store::StoreError::Duplicate(key),
            LmdbError::Corruption(msg) => caves_store::StoreError::Corruption(msg),
            other => caves_store::StoreError::Backend(other.to_string()),
        }
    }
}
