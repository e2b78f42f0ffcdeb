//! Keys of the per-DAO record space.
//!
//! Every piece of DAO state is stored as its own record so a mutation writes
//! only what it touched. Keys are fixed width and big-endian, so a cursor
//! walk yields each DAO's records grouped together, metadata first, then
//! members in admission order, posts, proposals and votes by index.

use crate::StoreError;
use caves_types::DaoId;

/// Record families, in key order within one DAO.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RecordKind {
    Dao = 0,
    Member = 1,
    Post = 2,
    Proposal = 3,
    Vote = 4,
}

impl RecordKind {
    fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::Dao,
            1 => Self::Member,
            2 => Self::Post,
            3 => Self::Proposal,
            4 => Self::Vote,
            _ => return None,
        })
    }
}

/// `dao_id ‖ kind ‖ index ‖ sub_index`, 25 bytes.
///
/// `index` is the member ordinal, post index or proposal index; `sub_index`
/// is the vote ordinal within a proposal and zero elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub dao_id: DaoId,
    pub kind: RecordKind,
    pub index: u64,
    pub sub_index: u64,
}

impl RecordKey {
    pub const LEN: usize = 25;

    pub fn dao(dao_id: DaoId) -> Self {
        Self::new(dao_id, RecordKind::Dao, 0, 0)
    }

    pub fn member(dao_id: DaoId, ordinal: u64) -> Self {
        Self::new(dao_id, RecordKind::Member, ordinal, 0)
    }

    pub fn post(dao_id: DaoId, index: u64) -> Self {
        Self::new(dao_id, RecordKind::Post, index, 0)
    }

    pub fn proposal(dao_id: DaoId, index: u64) -> Self {
        Self::new(dao_id, RecordKind::Proposal, index, 0)
    }

    pub fn vote(dao_id: DaoId, proposal: u64, ordinal: u64) -> Self {
        Self::new(dao_id, RecordKind::Vote, proposal, ordinal)
    }

    fn new(dao_id: DaoId, kind: RecordKind, index: u64, sub_index: u64) -> Self {
        Self {
            dao_id,
            kind,
            index,
            sub_index,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..8].copy_from_slice(&self.dao_id.to_be_bytes());
        out[8] = self.kind as u8;
        out[9..17].copy_from_slice(&self.index.to_be_bytes());
        out[17..].copy_from_slice(&self.sub_index.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != Self::LEN {
            return Err(StoreError::Corruption(format!(
                "record key of length {} (expected {})",
                bytes.len(),
                Self::LEN
            )));
        }
        let u64_at = |at: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[at..at + 8]);
            u64::from_be_bytes(buf)
        };
        let kind = RecordKind::from_u8(bytes[8])
            .ok_or_else(|| StoreError::Corruption(format!("unknown record kind {}", bytes[8])))?;
        Ok(Self {
            dao_id: DaoId::new(u64_at(0)),
            kind,
            index: u64_at(9),
            sub_index: u64_at(17),
        })
    }
}
