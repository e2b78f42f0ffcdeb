//! Core governance engine.
//!
//! [`Caves`] is the only entry point callers mutate state through. Locking:
//! the registry sits behind an `RwLock` (write-held only while creating a
//! DAO), and each DAO's [`DaoState`] behind its own `Mutex`, held for the
//! whole of an operation including the escrow call. Calls on one DAO are
//! therefore totally ordered; calls on different DAOs do not contend except
//! on the event sequence, which is taken after the DAO lock.
//!
//! Every mutating operation follows the same shape: validate against the
//! locked state, perform the external step (escrow, if any), draft the
//! changed entities, reserve the event sequence, write the changed records
//! and the event in one store batch, apply the draft in memory, publish the
//! event. A failure at any step leaves the in-memory state, the store and
//! the event log as they were, and the reserved sequence unused.

use std::sync::{Arc, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use caves_store::{GovernanceStore, WriteBatch};
use caves_token::TokenLedger;
use caves_types::{AccountId, DaoId, DaoRef, Role, RoleKind};

use crate::dao::{Dao, DaoState};
use crate::error::GovernanceError;
use crate::events::{Event, EventEmitter, EventSlot, EventSubscription, DEFAULT_CHANNEL_CAPACITY};
use crate::membership::MembershipRecord;
use crate::post::{NewPost, Post};
use crate::proposal::{Proposal, ProposalTally};
use crate::records;
use crate::registry::{DaoHandle, DaoRegistry};

pub struct Caves<L: TokenLedger> {
    /// Account the engine acts as: escrow spender and stake custodian.
    account: AccountId,
    ledger: L,
    registry: RwLock<DaoRegistry>,
    emitter: EventEmitter,
    store: Option<Arc<dyn GovernanceStore>>,
}

fn lock_state(handle: &DaoHandle) -> MutexGuard<'_, DaoState> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<L: TokenLedger> Caves<L> {
    /// An in-memory engine with no persistence.
    pub fn new(account: AccountId, ledger: L) -> Self {
        Self::with_capacity(account, ledger, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(account: AccountId, ledger: L, event_capacity: usize) -> Self {
        Self {
            account,
            ledger,
            registry: RwLock::new(DaoRegistry::new()),
            emitter: EventEmitter::new(event_capacity),
            store: None,
        }
    }

    /// A persistent engine, restoring every DAO and the event log from `store`.
    pub fn open(
        account: AccountId,
        ledger: L,
        store: Arc<dyn GovernanceStore>,
        event_capacity: usize,
    ) -> Result<Self, GovernanceError> {
        let states = records::restore(store.iter_records()?)?;
        let registry = DaoRegistry::from_states(states)?;
        let emitter = EventEmitter::restore(event_capacity, store.iter_events()?)?;
        tracing::info!(
            daos = registry.len(),
            events = emitter.len(),
            next_sequence = emitter.next_sequence(),
            account = %account,
            "governance engine restored"
        );
        Ok(Self {
            account,
            ledger,
            registry: RwLock::new(registry),
            emitter,
            store: Some(store),
        })
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn events(&self) -> &EventEmitter {
        &self.emitter
    }

    pub fn subscribe(&self) -> EventSubscription {
        self.emitter.subscribe()
    }

    pub fn subscribe_dao(&self, dao: impl Into<DaoRef>) -> Result<EventSubscription, GovernanceError> {
        let id = self.read_registry().resolve(&dao.into())?;
        Ok(self.emitter.subscribe_dao(id))
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, DaoRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, DaoRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch a DAO's handle; the registry lock is released before returning.
    fn handle(&self, dao: impl Into<DaoRef>) -> Result<DaoHandle, GovernanceError> {
        self.read_registry().get(&dao.into())
    }

    /// Reserve the next event sequence and durably write `event` with the
    /// records `stage` puts into the batch.
    ///
    /// On success the caller applies its change in memory and publishes the
    /// returned slot. On failure nothing was written and the sequence is
    /// released. Without a store only the reservation happens.
    fn commit(
        &self,
        event: &Event,
        stage: impl FnOnce(&mut WriteBatch) -> Result<(), GovernanceError>,
    ) -> Result<EventSlot<'_>, GovernanceError> {
        let slot = self.emitter.reserve();
        if let Some(store) = &self.store {
            let mut batch = WriteBatch::new();
            stage(&mut batch)?;
            let record = slot.record(event.clone());
            batch.put_event(record.sequence, bincode::serialize(&record)?);
            store.commit(&batch)?;
        }
        Ok(slot)
    }

    // ── DAO registry ───────────────────────────────────────────────────

    pub fn create_dao(
        &self,
        creator: &AccountId,
        name: &str,
        description: &str,
        board_stake_requirement: u64,
        vote_threshold: u64,
    ) -> Result<DaoId, GovernanceError> {
        let mut registry = self.write_registry();
        if let Err(e) = registry.check_name(name) {
            tracing::warn!(name, error = %e, "DAO creation rejected");
            return Err(e);
        }
        let id = registry.next_id();
        let dao = Dao {
            id,
            name: name.to_string(),
            description: description.to_string(),
            creator: creator.clone(),
            board_stake_requirement,
            vote_threshold,
            board_member_count: 0,
        };
        let event = Event::DaoCreated {
            dao_id: id,
            name: name.to_string(),
            creator: creator.clone(),
        };
        let slot = self
            .commit(&event, |batch| records::put_dao(batch, &dao))
            .inspect_err(|e| tracing::error!(dao_id = %id, name, error = %e, "failed to store new DAO"))?;
        registry.insert(DaoState::new(dao));

        tracing::info!(dao_id = %id, name, creator = %creator, board_stake_requirement, vote_threshold, "DAO created");
        slot.publish(event);
        Ok(id)
    }

    pub fn get_dao(&self, dao: impl Into<DaoRef>) -> Result<Dao, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        Ok(state.dao.clone())
    }

    pub fn resolve(&self, dao: impl Into<DaoRef>) -> Result<DaoId, GovernanceError> {
        self.read_registry().resolve(&dao.into())
    }

    /// Metadata of every DAO, in id order.
    pub fn list_daos(&self) -> Vec<Dao> {
        let handles = self.read_registry().handles();
        handles.iter().map(|h| lock_state(h).dao.clone()).collect()
    }

    pub fn dao_count(&self) -> usize {
        self.read_registry().len()
    }

    // ── Membership ─────────────────────────────────────────────────────

    pub fn join_as_member(
        &self,
        dao: impl Into<DaoRef>,
        account: &AccountId,
    ) -> Result<(), GovernanceError> {
        let handle = self.handle(dao)?;
        let mut state = lock_state(&handle);
        let dao_id = state.id();

        if let Err(e) = state.members.ensure_can_join(account) {
            tracing::warn!(dao_id = %dao_id, account = %account, error = %e, "member join rejected");
            return Err(e);
        }
        let ordinal = state.members.next_ordinal();
        let event = Event::MemberJoined {
            dao_id,
            account: account.clone(),
        };
        let slot = self
            .commit(&event, |batch| {
                records::put_member(batch, dao_id, ordinal, account, Role::Member)
            })
            .inspect_err(|e| tracing::error!(dao_id = %dao_id, account = %account, error = %e, "failed to store member"))?;
        state.members.insert(account.clone(), Role::Member);

        tracing::info!(dao_id = %dao_id, account = %account, "member joined");
        slot.publish(event);
        Ok(())
    }

    /// Escrow `stake` from `account` and admit it as a board member.
    ///
    /// The caller must have approved the engine account for at least `stake`
    /// on the token ledger. If escrow fails nothing is recorded. If the
    /// escrowed admission cannot be stored the stake is transferred back.
    /// The engine's own account can never hold a seat: escrowing from it
    /// would move no tokens.
    pub fn join_as_board_member(
        &self,
        dao: impl Into<DaoRef>,
        account: &AccountId,
        stake: u64,
    ) -> Result<(), GovernanceError> {
        let handle = self.handle(dao)?;
        let mut state = lock_state(&handle);
        let dao_id = state.id();

        let checked = state
            .members
            .ensure_can_join(account)
            .and_then(|()| {
                if account == &self.account {
                    return Err(GovernanceError::Unauthorized {
                        account: account.clone(),
                        required: RoleKind::BoardMember,
                    });
                }
                Ok(())
            })
            .and_then(|()| state.dao.check_stake(stake));
        if let Err(e) = checked {
            tracing::warn!(dao_id = %dao_id, account = %account, stake, error = %e, "board join rejected");
            return Err(e);
        }

        if let Err(e) = self.ledger.transfer_from(account, &self.account, stake) {
            tracing::warn!(dao_id = %dao_id, account = %account, stake, error = %e, "stake escrow failed");
            return Err(GovernanceError::EscrowFailed(e));
        }

        let role = Role::BoardMember { stake };
        let ordinal = state.members.next_ordinal();
        let mut dao = state.dao.clone();
        dao.board_member_count = dao.board_member_count.saturating_add(1);
        let event = Event::BoardMemberJoined {
            dao_id,
            account: account.clone(),
            stake,
        };
        let committed = self.commit(&event, |batch| {
            records::put_member(batch, dao_id, ordinal, account, role)?;
            records::put_dao(batch, &dao)
        });
        let slot = match committed {
            Ok(slot) => slot,
            Err(e) => {
                tracing::error!(dao_id = %dao_id, account = %account, stake, error = %e, "board admission failed after escrow, refunding");
                if let Err(refund) = self.ledger.transfer(&self.account, account, stake) {
                    tracing::error!(dao_id = %dao_id, account = %account, stake, error = %refund, "stake refund failed");
                }
                return Err(e);
            }
        };
        state.members.insert(account.clone(), role);
        state.dao = dao;

        tracing::info!(dao_id = %dao_id, account = %account, stake, board_members = state.dao.board_member_count, "board member joined");
        slot.publish(event);
        Ok(())
    }

    pub fn role_of(&self, dao: impl Into<DaoRef>, account: &AccountId) -> Result<Role, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        Ok(state.members.role_of(account))
    }

    /// Whether `account` holds the regular `Member` role (board members are not).
    pub fn is_member(&self, dao: impl Into<DaoRef>, account: &AccountId) -> Result<bool, GovernanceError> {
        Ok(self.role_of(dao, account)? == Role::Member)
    }

    pub fn is_board_member(
        &self,
        dao: impl Into<DaoRef>,
        account: &AccountId,
    ) -> Result<bool, GovernanceError> {
        Ok(self.role_of(dao, account)?.is_board_member())
    }

    pub fn membership(
        &self,
        dao: impl Into<DaoRef>,
        account: &AccountId,
    ) -> Result<MembershipRecord, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        Ok(MembershipRecord {
            dao_id: state.id(),
            account: account.clone(),
            role: state.members.role_of(account),
        })
    }

    /// Every account holding a role in the DAO, ordered by account.
    pub fn members(&self, dao: impl Into<DaoRef>) -> Result<Vec<MembershipRecord>, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        Ok(state.members.records(state.id()))
    }

    /// Board members and their stakes, in admission order.
    pub fn board_members(&self, dao: impl Into<DaoRef>) -> Result<Vec<(AccountId, u64)>, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        Ok(state.members.board_members())
    }

    pub fn total_staked(&self, dao: impl Into<DaoRef>) -> Result<u64, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        Ok(state.members.total_staked())
    }

    // ── Posts ──────────────────────────────────────────────────────────

    pub fn create_post(
        &self,
        dao: impl Into<DaoRef>,
        post: NewPost,
        author: &AccountId,
    ) -> Result<u64, GovernanceError> {
        let handle = self.handle(dao)?;
        let mut state = lock_state(&handle);
        let dao_id = state.id();

        if let Err(e) = state.members.require(author, RoleKind::Member) {
            tracing::warn!(dao_id = %dao_id, author = %author, "post rejected: not a member");
            return Err(e);
        }
        let post = state.posts.draft(dao_id, post, author.clone());
        let index = post.index;
        let event = Event::PostCreated {
            dao_id,
            index,
            author: author.clone(),
        };
        let slot = self
            .commit(&event, |batch| records::put_post(batch, &post))
            .inspect_err(|e| tracing::error!(dao_id = %dao_id, index, error = %e, "failed to store post"))?;
        state.posts.push(post);

        tracing::info!(dao_id = %dao_id, index, author = %author, "post created");
        slot.publish(event);
        Ok(index)
    }

    pub fn get_post(&self, dao: impl Into<DaoRef>, index: u64) -> Result<Post, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        state.posts.get(state.id(), index).cloned()
    }

    pub fn post_count(&self, dao: impl Into<DaoRef>) -> Result<u64, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        Ok(state.posts.len())
    }

    // ── Proposals ──────────────────────────────────────────────────────

    pub fn create_proposal(
        &self,
        dao: impl Into<DaoRef>,
        title: &str,
        topic: &str,
        proposer: &AccountId,
    ) -> Result<u64, GovernanceError> {
        let handle = self.handle(dao)?;
        let mut state = lock_state(&handle);
        let dao_id = state.id();

        if let Err(e) = state.members.require(proposer, RoleKind::BoardMember) {
            tracing::warn!(dao_id = %dao_id, proposer = %proposer, "proposal rejected: not a board member");
            return Err(e);
        }
        let proposal = state
            .proposals
            .draft(dao_id, title.to_string(), topic.to_string(), proposer.clone());
        let index = proposal.index;
        let event = Event::ProposalCreated {
            dao_id,
            index,
            proposer: proposer.clone(),
        };
        let slot = self
            .commit(&event, |batch| records::put_proposal(batch, &proposal))
            .inspect_err(|e| tracing::error!(dao_id = %dao_id, index, error = %e, "failed to store proposal"))?;
        state.proposals.push(proposal);

        tracing::info!(dao_id = %dao_id, index, proposer = %proposer, topic, "proposal created");
        slot.publish(event);
        Ok(index)
    }

    /// Record a board member's vote and return the updated tally.
    pub fn vote_proposal(
        &self,
        dao: impl Into<DaoRef>,
        index: u64,
        voter: &AccountId,
        support: bool,
    ) -> Result<ProposalTally, GovernanceError> {
        let handle = self.handle(dao)?;
        let mut state = lock_state(&handle);
        let dao_id = state.id();

        let drafted = state
            .proposals
            .get(dao_id, index)
            .and_then(|p| state.members.require(voter, RoleKind::BoardMember).map(|_| p))
            .and_then(|p| {
                let ordinal = p.vote_count() as u64;
                let mut updated = p.clone();
                let tally = updated.record_vote(voter.clone(), support, |yes| state.dao.accepts(yes))?;
                Ok((updated, ordinal, tally))
            });
        let (updated, ordinal, tally) = match drafted {
            Ok(drafted) => drafted,
            Err(e) => {
                tracing::warn!(dao_id = %dao_id, index, voter = %voter, error = %e, "vote rejected");
                return Err(e);
            }
        };

        let event = Event::ProposalVoted {
            dao_id,
            index,
            voter: voter.clone(),
            support,
            is_accepted: tally.is_accepted,
        };
        let slot = self
            .commit(&event, |batch| {
                records::put_proposal(batch, &updated)?;
                records::put_vote(batch, &updated, ordinal, voter, support)
            })
            .inspect_err(|e| tracing::error!(dao_id = %dao_id, index, voter = %voter, error = %e, "failed to store vote"))?;
        state.proposals.replace(updated);

        tracing::info!(
            dao_id = %dao_id,
            index,
            voter = %voter,
            support,
            yes = tally.yes_count,
            no = tally.no_count,
            accepted = tally.is_accepted,
            "vote recorded"
        );
        slot.publish(event);
        Ok(tally)
    }

    pub fn get_proposal(&self, dao: impl Into<DaoRef>, index: u64) -> Result<Proposal, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        state.proposals.get(state.id(), index).cloned()
    }

    pub fn proposal_tally(&self, dao: impl Into<DaoRef>, index: u64) -> Result<ProposalTally, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        Ok(state.proposals.get(state.id(), index)?.tally())
    }

    pub fn proposal_count(&self, dao: impl Into<DaoRef>) -> Result<u64, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        Ok(state.proposals.len())
    }

    pub fn vote_of(
        &self,
        dao: impl Into<DaoRef>,
        index: u64,
        voter: &AccountId,
    ) -> Result<Option<bool>, GovernanceError> {
        let handle = self.handle(dao)?;
        let state = lock_state(&handle);
        Ok(state.proposals.get(state.id(), index)?.vote_of(voter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use caves_nullables::NullStore;
    use caves_store::EventStore;
    use caves_token::WikiToken;

    fn account(name: &str) -> AccountId {
        AccountId::new(format!("0x{name}"))
    }

    struct Fixture {
        caves: Caves<Arc<WikiToken>>,
        token: Arc<WikiToken>,
        deployer: AccountId,
    }

    fn fixture() -> Fixture {
        let deployer = account("deployer");
        let token = Arc::new(WikiToken::new(deployer.clone(), 1_000_000));
        let caves = Caves::new(account("caves"), Arc::clone(&token));
        Fixture {
            caves,
            token,
            deployer,
        }
    }

    impl Fixture {
        fn dao(&self) -> DaoId {
            self.caves
                .create_dao(&self.deployer, "TestDAO", "This is a test DAO", 10, 100)
                .unwrap()
        }

        /// Fund `who`, approve the engine and join the board with `stake`.
        fn board(&self, dao: DaoId, who: &AccountId, stake: u64) {
            self.token.transfer(&self.deployer, who, stake).unwrap();
            self.token.approve(who, self.caves.account(), stake);
            self.caves.join_as_board_member(dao, who, stake).unwrap();
        }
    }

    #[test]
    fn create_dao_assigns_ids_from_one() {
        let f = fixture();
        let first = f.dao();
        let second = f.caves.create_dao(&f.deployer, "Other", "", 0, 1).unwrap();
        assert_eq!(first, DaoId::new(1));
        assert_eq!(second, DaoId::new(2));

        let dao = f.caves.get_dao("TestDAO").unwrap();
        assert_eq!(dao.id, first);
        assert_eq!(dao.creator, f.deployer);
        assert_eq!(dao.board_stake_requirement, 10);
        assert_eq!(dao.vote_threshold, 100);
        assert_eq!(dao.board_member_count, 0);
        let names: Vec<String> = f.caves.list_daos().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["TestDAO", "Other"]);
    }

    #[test]
    fn duplicate_name_fails_without_event() {
        let f = fixture();
        f.dao();
        let events = f.caves.events().len();
        let err = f
            .caves
            .create_dao(&account("other"), "TestDAO", "again", 1, 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert_eq!(f.caves.dao_count(), 1);
        assert_eq!(f.caves.events().len(), events);
    }

    #[test]
    fn blank_name_rejected() {
        let f = fixture();
        let err = f.caves.create_dao(&f.deployer, " ", "", 1, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn unknown_dao_is_not_found() {
        let f = fixture();
        let who = account("a");
        assert_eq!(
            f.caves.join_as_member("Nope", &who).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            f.caves.get_dao(DaoId::new(7)).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert!(f.caves.events().is_empty());
    }

    #[test]
    fn member_join_is_exclusive() {
        let f = fixture();
        let dao = f.dao();
        let a = account("a");
        f.caves.join_as_member(dao, &a).unwrap();
        assert!(f.caves.is_member(dao, &a).unwrap());
        assert!(!f.caves.is_board_member(dao, &a).unwrap());

        let err = f.caves.join_as_member(dao, &a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyMember);

        f.token.transfer(&f.deployer, &a, 10).unwrap();
        f.token.approve(&a, f.caves.account(), 10);
        let err = f.caves.join_as_board_member(dao, &a, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyMember);
        // The rejected board join must not have touched the ledger.
        assert_eq!(f.token.balance_of(&a), 10);
        assert_eq!(f.caves.role_of(dao, &a).unwrap(), Role::Member);
    }

    #[test]
    fn board_join_escrows_declared_stake() {
        let f = fixture();
        let dao = f.dao();
        let b = account("b");
        f.board(dao, &b, 20);

        assert_eq!(f.caves.role_of(dao, &b).unwrap(), Role::BoardMember { stake: 20 });
        assert!(!f.caves.is_member(dao, &b).unwrap());
        assert_eq!(f.token.balance_of(&b), 0);
        assert_eq!(f.token.balance_of(f.caves.account()), 20);
        assert_eq!(f.caves.get_dao(dao).unwrap().board_member_count, 1);
        assert_eq!(f.caves.total_staked(dao).unwrap(), 20);
        assert_eq!(f.caves.board_members(dao).unwrap(), vec![(b.clone(), 20)]);

        let err = f.caves.join_as_member(dao, &b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyBoardMember);
    }

    #[test]
    fn stake_below_requirement_rejected() {
        let f = fixture();
        let dao = f.dao();
        let b = account("b");
        f.token.transfer(&f.deployer, &b, 100).unwrap();
        f.token.approve(&b, f.caves.account(), 100);

        let err = f.caves.join_as_board_member(dao, &b, 9).unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::InsufficientStake {
                required: 10,
                offered: 9
            }
        ));
        assert_eq!(f.token.balance_of(&b), 100);
        assert_eq!(f.caves.role_of(dao, &b).unwrap(), Role::None);
    }

    #[test]
    fn zero_stake_rejected_even_without_requirement() {
        let f = fixture();
        let dao = f.caves.create_dao(&f.deployer, "Free", "", 0, 1).unwrap();
        let err = f.caves.join_as_board_member(dao, &account("b"), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStake);
    }

    #[test]
    fn failed_escrow_changes_nothing() {
        let f = fixture();
        let dao = f.dao();
        let b = account("b");
        // Funded but never approved.
        f.token.transfer(&f.deployer, &b, 10).unwrap();
        let events = f.caves.events().len();

        let err = f.caves.join_as_board_member(dao, &b, 10).unwrap_err();
        assert!(matches!(err, GovernanceError::EscrowFailed(_)));
        assert_eq!(f.caves.role_of(dao, &b).unwrap(), Role::None);
        assert_eq!(f.caves.get_dao(dao).unwrap().board_member_count, 0);
        assert_eq!(f.token.balance_of(&b), 10);
        assert_eq!(f.caves.events().len(), events);

        // Approved but unfunded.
        let c = account("c");
        f.token.approve(&c, f.caves.account(), 10);
        let err = f.caves.join_as_board_member(dao, &c, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EscrowFailed);
        assert_eq!(f.caves.role_of(dao, &c).unwrap(), Role::None);
    }

    #[test]
    fn engine_account_cannot_take_a_board_seat() {
        let f = fixture();
        let dao = f.dao();
        let engine = f.caves.account().clone();
        f.token.transfer(&f.deployer, &engine, 100).unwrap();
        f.token.approve(&engine, &engine, 10);
        let events = f.caves.events().len();

        let err = f.caves.join_as_board_member(dao, &engine, 10).unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::Unauthorized {
                required: RoleKind::BoardMember,
                ..
            }
        ));
        assert_eq!(f.caves.role_of(dao, &engine).unwrap(), Role::None);
        assert_eq!(f.token.balance_of(&engine), 100);
        assert_eq!(f.token.allowance(&engine, &engine), 10);
        assert_eq!(f.caves.total_staked(dao).unwrap(), 0);
        assert_eq!(f.caves.get_dao(dao).unwrap().board_member_count, 0);
        assert_eq!(f.caves.events().len(), events);

        // A regular seat holds no stake, so it is not affected.
        f.caves.join_as_member(dao, &engine).unwrap();
    }

    #[test]
    fn posting_requires_membership() {
        let f = fixture();
        let dao = f.dao();
        let a = account("a");
        let b = account("b");
        let outsider = account("x");
        f.caves.join_as_member(dao, &a).unwrap();
        f.board(dao, &b, 10);

        assert_eq!(f.caves.create_post(dao, NewPost::new("one", "1"), &a).unwrap(), 0);
        assert_eq!(f.caves.create_post(dao, NewPost::new("two", "2"), &b).unwrap(), 1);
        let err = f
            .caves
            .create_post(dao, NewPost::new("three", "3"), &outsider)
            .unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::Unauthorized {
                required: RoleKind::Member,
                ..
            }
        ));
        assert_eq!(f.caves.post_count(dao).unwrap(), 2);
        assert_eq!(f.caves.get_post(dao, 1).unwrap().author, b);
        assert_eq!(f.caves.get_post(dao, 2).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn proposals_require_board_membership() {
        let f = fixture();
        let dao = f.dao();
        let a = account("a");
        f.caves.join_as_member(dao, &a).unwrap();
        let err = f
            .caves
            .create_proposal(dao, "First Proposal!", "PublishPost", &a)
            .unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::Unauthorized {
                required: RoleKind::BoardMember,
                ..
            }
        ));
        assert_eq!(f.caves.proposal_count(dao).unwrap(), 0);
    }

    #[test]
    fn votes_tally_and_accept_at_threshold() {
        let f = fixture();
        let dao = f.caves.create_dao(&f.deployer, "Small", "", 5, 2).unwrap();
        let voters: Vec<AccountId> = (0..4).map(|i| account(&format!("b{i}"))).collect();
        for v in &voters {
            f.board(dao, v, 5);
        }
        let index = f.caves.create_proposal(dao, "p", "PublishPost", &voters[0]).unwrap();
        assert_eq!(index, 0);

        let t = f.caves.vote_proposal(dao, index, &voters[0], false).unwrap();
        assert_eq!((t.yes_count, t.no_count, t.is_accepted), (0, 1, false));
        let t = f.caves.vote_proposal(dao, index, &voters[1], true).unwrap();
        assert!(!t.is_accepted);
        let t = f.caves.vote_proposal(dao, index, &voters[2], true).unwrap();
        assert!(t.is_accepted);
        let t = f.caves.vote_proposal(dao, index, &voters[3], false).unwrap();
        assert_eq!((t.yes_count, t.no_count, t.is_accepted), (2, 2, true));

        assert_eq!(f.caves.vote_of(dao, index, &voters[1]).unwrap(), Some(true));
        assert_eq!(f.caves.proposal_tally(dao, index).unwrap(), t);
        assert_eq!(f.caves.get_proposal(dao, index).unwrap().vote_count(), 4);
    }

    #[test]
    fn second_vote_rejected() {
        let f = fixture();
        let dao = f.dao();
        let b = account("b");
        f.board(dao, &b, 10);
        let index = f.caves.create_proposal(dao, "p", "t", &b).unwrap();
        f.caves.vote_proposal(dao, index, &b, true).unwrap();
        let events = f.caves.events().len();

        let err = f.caves.vote_proposal(dao, index, &b, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyVoted);
        let tally = f.caves.proposal_tally(dao, index).unwrap();
        assert_eq!((tally.yes_count, tally.no_count), (1, 0));
        assert_eq!(f.caves.events().len(), events);
    }

    #[test]
    fn vote_on_missing_proposal_or_by_member() {
        let f = fixture();
        let dao = f.dao();
        let a = account("a");
        let b = account("b");
        f.caves.join_as_member(dao, &a).unwrap();
        f.board(dao, &b, 10);
        assert_eq!(
            f.caves.vote_proposal(dao, 0, &b, true).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        let index = f.caves.create_proposal(dao, "p", "t", &b).unwrap();
        assert_eq!(
            f.caves.vote_proposal(dao, index, &a, true).unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn zero_threshold_accepts_on_first_vote() {
        let f = fixture();
        let dao = f.caves.create_dao(&f.deployer, "Eager", "", 1, 0).unwrap();
        let b = account("b");
        f.board(dao, &b, 1);
        let index = f.caves.create_proposal(dao, "p", "t", &b).unwrap();
        assert!(!f.caves.get_proposal(dao, index).unwrap().is_accepted);
        assert!(f.caves.vote_proposal(dao, index, &b, false).unwrap().is_accepted);
    }

    #[test]
    fn one_event_per_successful_operation() {
        let f = fixture();
        let mut sub = f.caves.subscribe();
        let dao = f.dao();
        let a = account("a");
        let b = account("b");
        f.caves.join_as_member(dao, &a).unwrap();
        f.board(dao, &b, 10);
        f.caves.create_post(dao, NewPost::new("t", "b"), &a).unwrap();
        let index = f.caves.create_proposal(dao, "p", "t", &b).unwrap();
        f.caves.vote_proposal(dao, index, &b, true).unwrap();

        let names: Vec<&str> = f.caves.events().events().iter().map(|r| r.event.name()).collect();
        assert_eq!(
            names,
            vec![
                "DAOCreated",
                "MemberJoined",
                "BoardMemberJoined",
                "PostCreated",
                "ProposalCreated",
                "ProposalVoted"
            ]
        );
        assert_eq!(sub.try_recv().unwrap().event.name(), "DAOCreated");
        match f.caves.events().events().last().map(|r| &r.event) {
            Some(Event::ProposalVoted { is_accepted, .. }) => assert!(!is_accepted),
            other => panic!("unexpected last event: {other:?}"),
        }
    }

    #[test]
    fn dao_subscription_sees_only_its_dao() {
        let f = fixture();
        let first = f.dao();
        let second = f.caves.create_dao(&f.deployer, "Other", "", 1, 1).unwrap();
        let mut sub = f.caves.subscribe_dao("Other").unwrap();
        f.caves.join_as_member(first, &account("a")).unwrap();
        f.caves.join_as_member(second, &account("a")).unwrap();
        let rec = sub.try_recv().unwrap();
        assert_eq!(rec.event.dao_id(), second);
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn members_lists_every_role() {
        let f = fixture();
        let dao = f.dao();
        f.caves.join_as_member(dao, &account("a")).unwrap();
        f.board(dao, &account("b"), 12);
        let roles: Vec<Role> = f.caves.members(dao).unwrap().into_iter().map(|r| r.role).collect();
        assert_eq!(roles, vec![Role::Member, Role::BoardMember { stake: 12 }]);
        assert_eq!(
            f.caves.membership(dao, &account("z")).unwrap().role,
            Role::None
        );
    }

    // --- persistence -------------------------------------------------------

    fn persistent(store: &Arc<NullStore>, token: &Arc<WikiToken>) -> Caves<Arc<WikiToken>> {
        Caves::open(account("caves"), Arc::clone(token), store.clone(), 16).unwrap()
    }

    #[test]
    fn state_survives_reopen() {
        let store = Arc::new(NullStore::new());
        let deployer = account("deployer");
        let token = Arc::new(WikiToken::new(deployer.clone(), 1_000));
        let b = account("b");
        {
            let caves = persistent(&store, &token);
            let dao = caves.create_dao(&deployer, "TestDAO", "", 10, 1).unwrap();
            token.transfer(&deployer, &b, 10).unwrap();
            token.approve(&b, caves.account(), 10);
            caves.join_as_board_member(dao, &b, 10).unwrap();
            caves.create_proposal(dao, "p", "t", &b).unwrap();
            caves.vote_proposal(dao, 0, &b, true).unwrap();
        }

        let caves = persistent(&store, &token);
        assert_eq!(caves.role_of("TestDAO", &b).unwrap(), Role::BoardMember { stake: 10 });
        assert!(caves.get_proposal("TestDAO", 0).unwrap().is_accepted);
        assert_eq!(caves.events().len(), 4);
        assert_eq!(
            caves.create_dao(&deployer, "TestDAO", "", 1, 1).unwrap_err().kind(),
            ErrorKind::DuplicateName
        );
        assert_eq!(caves.create_dao(&deployer, "Next", "", 1, 1).unwrap(), DaoId::new(2));
        assert_eq!(caves.events().events().last().unwrap().sequence, 4);
    }

    #[test]
    fn store_failure_after_escrow_refunds_stake() {
        let store = Arc::new(NullStore::new());
        let deployer = account("deployer");
        let token = Arc::new(WikiToken::new(deployer.clone(), 1_000));
        let caves = persistent(&store, &token);
        let dao = caves.create_dao(&deployer, "TestDAO", "", 10, 1).unwrap();
        let b = account("b");
        token.transfer(&deployer, &b, 10).unwrap();
        token.approve(&b, caves.account(), 10);
        let events = caves.events().len();

        store.fail_commits(true);
        let err = caves.join_as_board_member(dao, &b, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(token.balance_of(&b), 10);
        assert_eq!(token.balance_of(caves.account()), 0);
        assert_eq!(caves.role_of(dao, &b).unwrap(), Role::None);
        assert_eq!(caves.get_dao(dao).unwrap().board_member_count, 0);
        assert_eq!(caves.events().len(), events);
    }

    #[test]
    fn store_failure_leaves_post_log_untouched() {
        let store = Arc::new(NullStore::new());
        let token = Arc::new(WikiToken::new(account("deployer"), 0));
        let caves = persistent(&store, &token);
        let dao = caves.create_dao(&account("deployer"), "TestDAO", "", 1, 1).unwrap();
        let a = account("a");
        caves.join_as_member(dao, &a).unwrap();

        store.fail_commits(true);
        assert!(caves.create_post(dao, NewPost::new("t", "b"), &a).is_err());
        assert_eq!(caves.post_count(dao).unwrap(), 0);
        assert!(caves.create_dao(&a, "Second", "", 1, 1).is_err());
        assert_eq!(caves.dao_count(), 1);

        store.fail_commits(false);
        assert_eq!(caves.create_post(dao, NewPost::new("t", "b"), &a).unwrap(), 0);
    }

    #[test]
    fn writes_touch_only_the_changed_entities() {
        let store = Arc::new(NullStore::new());
        let deployer = account("deployer");
        let token = Arc::new(WikiToken::new(deployer.clone(), 1_000));
        let caves = persistent(&store, &token);
        let dao = caves.create_dao(&deployer, "TestDAO", "", 1, 1_000).unwrap();
        let a = account("a");
        caves.join_as_member(dao, &a).unwrap();

        caves.create_post(dao, NewPost::new("t", "b"), &a).unwrap();
        let first_post = store.last_commit_bytes();
        for _ in 0..50 {
            caves.create_post(dao, NewPost::new("t", "b"), &a).unwrap();
        }
        assert_eq!(store.last_commit_bytes(), first_post);

        let voters: Vec<AccountId> = (0..30).map(|i| account(&format!("v{i:02}"))).collect();
        for v in &voters {
            token.transfer(&deployer, v, 1).unwrap();
            token.approve(v, caves.account(), 1);
            caves.join_as_board_member(dao, v, 1).unwrap();
        }
        let index = caves.create_proposal(dao, "p", "t", &voters[0]).unwrap();
        caves.vote_proposal(dao, index, &voters[0], true).unwrap();
        let first_vote = store.last_commit_bytes();
        for v in &voters[1..] {
            caves.vote_proposal(dao, index, v, true).unwrap();
        }
        assert_eq!(store.last_commit_bytes(), first_vote);
    }

    #[test]
    fn failed_write_does_not_consume_a_sequence() {
        let store = Arc::new(NullStore::new());
        let deployer = account("deployer");
        let token = Arc::new(WikiToken::new(deployer.clone(), 1_000));
        let b = account("b");
        {
            let caves = persistent(&store, &token);
            let dao = caves.create_dao(&deployer, "TestDAO", "", 10, 1).unwrap();
            token.transfer(&deployer, &b, 10).unwrap();
            token.approve(&b, caves.account(), 10);
            caves.join_as_board_member(dao, &b, 10).unwrap();
            let index = caves.create_proposal(dao, "p", "t", &b).unwrap();
            let mut sub = caves.subscribe();

            store.fail_commits(true);
            assert!(caves.create_post(dao, NewPost::new("t", "b"), &b).is_err());
            assert!(caves.vote_proposal(dao, index, &b, true).is_err());
            assert_eq!(caves.events().next_sequence(), 3);
            assert!(sub.try_recv().is_err());
            assert_eq!(caves.vote_of(dao, index, &b).unwrap(), None);
            assert_eq!(store.event_count().unwrap(), 3);
        }

        store.fail_commits(false);
        let caves = persistent(&store, &token);
        assert_eq!(caves.events().next_sequence(), 3);
        caves.vote_proposal("TestDAO", 0, &b, true).unwrap();
        let sequences: Vec<u64> = caves.events().events().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
        assert_eq!(store.event_count().unwrap(), 4);
        assert!(caves.get_proposal("TestDAO", 0).unwrap().is_accepted);
    }
}
