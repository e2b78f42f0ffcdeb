//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid account id: {0:?}")]
    InvalidAccount(String),

    #[error("invalid DAO reference: {0:?}")]
    InvalidDaoRef(String),
}
