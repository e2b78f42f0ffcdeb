//! Fundamental types for the Caves governance engine.
//!
//! Shared by every other crate in the workspace: account identities, DAO
//! identifiers, membership roles, and the base parse error.

pub mod account;
pub mod error;
pub mod id;
pub mod role;

pub use account::AccountId;
pub use error::TypesError;
pub use id::{DaoId, DaoRef};
pub use role::{Role, RoleKind};
