//! Token ledger errors.

use crate::wiki_token::TokenRole;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("spender not authorized: need allowance {needed}, have {allowed}")]
    NotAuthorized { needed: u64, allowed: u64 },

    #[error("account is missing role {0}")]
    MissingRole(TokenRole),

    #[error("amount overflows the ledger")]
    Overflow,
}
