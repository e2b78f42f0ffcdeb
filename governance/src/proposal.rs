//! Proposals, their vote ledgers, and the running tally.
//!
//! `is_accepted` is a projection of the tally, recomputed after every vote.
//! There is no closed state: a proposal keeps accepting votes from board
//! members who have not voted yet.

use std::collections::HashMap;

use caves_types::{AccountId, DaoId};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub dao_id: DaoId,
    /// Position in the DAO's proposal list, starting at 0.
    pub index: u64,
    pub title: String,
    /// Category tag, e.g. `"PublishPost"`.
    pub topic: String,
    pub proposer: AccountId,
    /// Each voter appears at most once. Persisted as separate vote records,
    /// so serializing a proposal yields only its header and tallies.
    #[serde(skip)]
    votes: HashMap<AccountId, bool>,
    pub yes_count: u32,
    pub no_count: u32,
    pub is_accepted: bool,
}

/// Snapshot of a proposal's counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTally {
    pub yes_count: u32,
    pub no_count: u32,
    pub is_accepted: bool,
}

impl Proposal {
    pub fn vote_of(&self, voter: &AccountId) -> Option<bool> {
        self.votes.get(voter).copied()
    }

    pub fn has_voted(&self, voter: &AccountId) -> bool {
        self.votes.contains_key(voter)
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn tally(&self) -> ProposalTally {
        ProposalTally {
            yes_count: self.yes_count,
            no_count: self.no_count,
            is_accepted: self.is_accepted,
        }
    }

    /// Record one vote and recompute acceptance.
    ///
    /// `accepts` is the DAO's acceptance rule applied to the new yes count.
    pub fn record_vote(
        &mut self,
        voter: AccountId,
        support: bool,
        accepts: impl Fn(u32) -> bool,
    ) -> Result<ProposalTally, GovernanceError> {
        if self.has_voted(&voter) {
            return Err(GovernanceError::AlreadyVoted(voter));
        }
        self.votes.insert(voter, support);
        if support {
            self.yes_count = self.yes_count.saturating_add(1);
        } else {
            self.no_count = self.no_count.saturating_add(1);
        }
        self.is_accepted = accepts(self.yes_count);
        Ok(self.tally())
    }

    /// Re-insert a stored vote without touching the tallies, which are
    /// restored with the header. Returns `false` for a repeated voter.
    pub(crate) fn restore_vote(&mut self, voter: AccountId, support: bool) -> bool {
        if self.has_voted(&voter) {
            return false;
        }
        self.votes.insert(voter, support);
        true
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProposalBook {
    proposals: Vec<Proposal>,
}

impl ProposalBook {
    /// The proposal that opening would produce, without adding it.
    pub fn draft(&self, dao_id: DaoId, title: String, topic: String, proposer: AccountId) -> Proposal {
        Proposal {
            dao_id,
            index: self.len(),
            title,
            topic,
            proposer,
            votes: HashMap::new(),
            yes_count: 0,
            no_count: 0,
            is_accepted: false,
        }
    }

    /// Add a drafted proposal. Its index must be the current length.
    pub(crate) fn push(&mut self, proposal: Proposal) {
        debug_assert_eq!(proposal.index, self.len());
        self.proposals.push(proposal);
    }

    /// Swap in an updated copy of an existing proposal.
    pub(crate) fn replace(&mut self, proposal: Proposal) {
        if let Some(slot) = usize::try_from(proposal.index)
            .ok()
            .and_then(|i| self.proposals.get_mut(i))
        {
            *slot = proposal;
        }
    }

    /// Open a proposal with an empty vote ledger; returns its index.
    pub fn open(
        &mut self,
        dao_id: DaoId,
        title: String,
        topic: String,
        proposer: AccountId,
    ) -> u64 {
        let proposal = self.draft(dao_id, title, topic, proposer);
        let index = proposal.index;
        self.push(proposal);
        index
    }

    pub fn get(&self, dao_id: DaoId, index: u64) -> Result<&Proposal, GovernanceError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.proposals.get(i))
            .ok_or(GovernanceError::ProposalNotFound { dao_id, index })
    }

    pub fn get_mut(&mut self, dao_id: DaoId, index: u64) -> Result<&mut Proposal, GovernanceError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.proposals.get_mut(i))
            .ok_or(GovernanceError::ProposalNotFound { dao_id, index })
    }

    pub fn len(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter()
    }
}
