//! Caves governance engine.
//!
//! Multi-tenant DAO governance over a shared token ledger: a registry of
//! uniquely named DAOs, each with its own membership (regular members and
//! staked board members), an append-only post log, and proposals decided by
//! a cumulative yes-vote threshold. Every committed transition publishes
//! one event.
//!
//! [`Caves`] is the facade; the other modules hold the per-DAO data it locks
//! and the per-entity records it persists.

pub mod dao;
pub mod engine;
pub mod error;
pub mod events;
pub mod membership;
pub mod post;
pub mod proposal;
pub mod records;
pub mod registry;

pub use dao::{Dao, DaoState};
pub use engine::Caves;
pub use error::{ErrorKind, GovernanceError};
pub use events::{
    Event, EventEmitter, EventRecord, EventSlot, EventSubscription, DEFAULT_CHANNEL_CAPACITY,
};
pub use membership::{MembershipBook, MembershipRecord};
pub use post::{NewPost, Post};
pub use proposal::{Proposal, ProposalTally};
pub use registry::DaoRegistry;
