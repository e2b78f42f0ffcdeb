//! Per-entity storage records.
//!
//! A DAO is stored as one record per entity rather than as a snapshot, so a
//! write touches only what the operation changed: the DAO metadata, one
//! membership admission, one post, one proposal header and one vote. Keys
//! come from [`RecordKey`]; values are bincode.
//!
//! | kind     | index            | sub_index     | value                 |
//! |----------|------------------|---------------|-----------------------|
//! | Dao      | 0                | 0             | [`Dao`]               |
//! | Member   | admission order  | 0             | `(AccountId, Role)`   |
//! | Post     | post index       | 0             | [`Post`]              |
//! | Proposal | proposal index   | 0             | [`Proposal`] header   |
//! | Vote     | proposal index   | vote order    | `(AccountId, bool)`   |

use caves_store::{RecordKey, RecordKind, StoreError, WriteBatch};
use caves_types::{AccountId, DaoId, Role};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::dao::{Dao, DaoState};
use crate::error::GovernanceError;
use crate::post::Post;
use crate::proposal::Proposal;

fn put<T: Serialize + ?Sized>(batch: &mut WriteBatch, key: RecordKey, value: &T) -> Result<(), GovernanceError> {
    batch.put_record(key, bincode::serialize(value)?);
    Ok(())
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GovernanceError> {
    Ok(bincode::deserialize(bytes)?)
}

fn corrupt(key: &RecordKey, what: &str) -> GovernanceError {
    GovernanceError::Store(StoreError::Corruption(format!(
        "{:?} record {}/{} of DAO {}: {what}",
        key.kind, key.index, key.sub_index, key.dao_id
    )))
}

pub(crate) fn put_dao(batch: &mut WriteBatch, dao: &Dao) -> Result<(), GovernanceError> {
    put(batch, RecordKey::dao(dao.id), dao)
}

pub(crate) fn put_member(
    batch: &mut WriteBatch,
    dao_id: DaoId,
    ordinal: u64,
    account: &AccountId,
    role: Role,
) -> Result<(), GovernanceError> {
    put(batch, RecordKey::member(dao_id, ordinal), &(account, role))
}

pub(crate) fn put_post(batch: &mut WriteBatch, post: &Post) -> Result<(), GovernanceError> {
    put(batch, RecordKey::post(post.dao_id, post.index), post)
}

pub(crate) fn put_proposal(batch: &mut WriteBatch, proposal: &Proposal) -> Result<(), GovernanceError> {
    put(batch, RecordKey::proposal(proposal.dao_id, proposal.index), proposal)
}

pub(crate) fn put_vote(
    batch: &mut WriteBatch,
    proposal: &Proposal,
    ordinal: u64,
    voter: &AccountId,
    support: bool,
) -> Result<(), GovernanceError> {
    put(
        batch,
        RecordKey::vote(proposal.dao_id, proposal.index, ordinal),
        &(voter, support),
    )
}

/// The DAO a non-metadata record belongs to: the last one restored.
fn owner<'a>(states: &'a mut [DaoState], key: &RecordKey) -> Result<&'a mut DaoState, GovernanceError> {
    states
        .last_mut()
        .filter(|s| s.id() == key.dao_id)
        .ok_or_else(|| corrupt(key, "no DAO metadata precedes it"))
}

/// Rebuild every DAO from its records.
///
/// `records` must be in key order, as both stores return them: each DAO's
/// metadata first, then its admissions, posts, proposals and votes. Gaps,
/// repeats and tallies that disagree with the stored votes are corruption.
pub fn restore(records: Vec<(RecordKey, Vec<u8>)>) -> Result<Vec<DaoState>, GovernanceError> {
    let mut states: Vec<DaoState> = Vec::new();
    for (key, bytes) in records {
        match key.kind {
            RecordKind::Dao => {
                let dao: Dao = decode(&bytes)?;
                if dao.id != key.dao_id {
                    return Err(corrupt(&key, &format!("holds DAO {}", dao.id)));
                }
                states.push(DaoState::new(dao));
            }
            RecordKind::Member => {
                let state = owner(&mut states, &key)?;
                let (account, role): (AccountId, Role) = decode(&bytes)?;
                if key.index != state.members.next_ordinal() {
                    return Err(corrupt(&key, "admission out of order"));
                }
                if !role.has_joined() || state.members.role_of(&account).has_joined() {
                    return Err(corrupt(&key, "invalid or repeated admission"));
                }
                state.members.insert(account, role);
            }
            RecordKind::Post => {
                let state = owner(&mut states, &key)?;
                let post: Post = decode(&bytes)?;
                if post.dao_id != key.dao_id || post.index != key.index || key.index != state.posts.len() {
                    return Err(corrupt(&key, "post out of order"));
                }
                state.posts.push(post);
            }
            RecordKind::Proposal => {
                let state = owner(&mut states, &key)?;
                let proposal: Proposal = decode(&bytes)?;
                if proposal.dao_id != key.dao_id
                    || proposal.index != key.index
                    || key.index != state.proposals.len()
                {
                    return Err(corrupt(&key, "proposal out of order"));
                }
                state.proposals.push(proposal);
            }
            RecordKind::Vote => {
                let state = owner(&mut states, &key)?;
                let (voter, support): (AccountId, bool) = decode(&bytes)?;
                let proposal = state
                    .proposals
                    .get_mut(key.dao_id, key.index)
                    .map_err(|_| corrupt(&key, "vote on a missing proposal"))?;
                if key.sub_index != proposal.vote_count() as u64 || !proposal.restore_vote(voter, support) {
                    return Err(corrupt(&key, "vote out of order or repeated"));
                }
            }
        }
    }

    for state in &states {
        if state.dao.board_member_count as usize != state.members.board_members().len() {
            return Err(corrupt(&RecordKey::dao(state.id()), "board count disagrees with admissions"));
        }
        for proposal in state.proposals.iter() {
            let tally = proposal.tally();
            if (tally.yes_count + tally.no_count) as usize != proposal.vote_count() {
                return Err(corrupt(
                    &RecordKey::proposal(state.id(), proposal.index),
                    "tally disagrees with stored votes",
                ));
            }
        }
    }
    Ok(states)
}
