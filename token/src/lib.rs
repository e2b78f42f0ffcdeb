//! Fungible token ledger for the Caves engine.
//!
//! The governance engine treats the ledger as an opaque capability
//! ([`TokenLedger`]): it reads balances and escrows stake through an
//! authorized `transfer_from`. [`WikiToken`] is the in-process ledger the
//! engine ships with: fixed initial supply held by the owner, allowances,
//! and role-gated minting.

pub mod error;
pub mod ledger;
pub mod wiki_token;

pub use error::TokenError;
pub use ledger::TokenLedger;
pub use wiki_token::{TokenRole, WikiToken};
