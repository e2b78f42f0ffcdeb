//! DAO records and the per-DAO state arena.

use caves_types::{AccountId, DaoId};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::membership::MembershipBook;
use crate::post::PostLog;
use crate::proposal::ProposalBook;

/// DAO metadata. Immutable after creation except `board_member_count`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dao {
    pub id: DaoId,
    /// Unique across the registry.
    pub name: String,
    pub description: String,
    /// Account that created the DAO.
    pub creator: AccountId,
    /// Minimum stake a board member must escrow.
    pub board_stake_requirement: u64,
    /// "Yes" votes needed for a proposal to count as accepted.
    pub vote_threshold: u64,
    pub board_member_count: u32,
}

impl Dao {
    /// The smallest stake the policy accepts; never zero.
    pub fn minimum_stake(&self) -> u64 {
        self.board_stake_requirement.max(1)
    }

    /// Check a declared stake against the board policy.
    ///
    /// The declared amount is accepted as-is when it clears the minimum; it is
    /// never rounded to the requirement.
    pub fn check_stake(&self, offered: u64) -> Result<(), GovernanceError> {
        let required = self.minimum_stake();
        if offered < required {
            return Err(GovernanceError::InsufficientStake { required, offered });
        }
        Ok(())
    }

    /// Acceptance rule: cumulative yes votes against the fixed threshold.
    /// No votes do not count against a proposal.
    pub fn accepts(&self, yes_count: u32) -> bool {
        u64::from(yes_count) >= self.vote_threshold
    }
}

/// Everything owned by one DAO: metadata plus its membership, post and
/// proposal arenas. This is the unit that is locked; it is persisted as
/// one record per entity (see [`crate::records`]).
#[derive(Clone, Debug)]
pub struct DaoState {
    pub dao: Dao,
    pub members: MembershipBook,
    pub posts: PostLog,
    pub proposals: ProposalBook,
}

impl DaoState {
    pub fn new(dao: Dao) -> Self {
        Self {
            dao,
            members: MembershipBook::default(),
            posts: PostLog::default(),
            proposals: ProposalBook::default(),
        }
    }

    pub fn id(&self) -> DaoId {
        self.dao.id
    }
}
