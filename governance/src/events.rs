//! Event emitter: the write-only notification side channel.
//!
//! The engine reserves a sequence number with [`EventEmitter::reserve`],
//! writes the event to storage in the same batch as the state change it
//! describes, and only then publishes it: the record is appended to the
//! retained log and fanned out to live subscribers over a
//! `tokio::sync::broadcast` channel. A reservation that is dropped without
//! publishing leaves the sequence unused. Nothing reads the log back to
//! decide state.

use std::sync::{Mutex, MutexGuard, PoisonError};

use caves_types::{AccountId, DaoId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::GovernanceError;

/// Default capacity of the live broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A committed state transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    DaoCreated {
        dao_id: DaoId,
        name: String,
        creator: AccountId,
    },
    MemberJoined {
        dao_id: DaoId,
        account: AccountId,
    },
    BoardMemberJoined {
        dao_id: DaoId,
        account: AccountId,
        stake: u64,
    },
    PostCreated {
        dao_id: DaoId,
        index: u64,
        author: AccountId,
    },
    ProposalCreated {
        dao_id: DaoId,
        index: u64,
        proposer: AccountId,
    },
    ProposalVoted {
        dao_id: DaoId,
        index: u64,
        voter: AccountId,
        support: bool,
        is_accepted: bool,
    },
}

impl Event {
    pub fn dao_id(&self) -> DaoId {
        match self {
            Self::DaoCreated { dao_id, .. }
            | Self::MemberJoined { dao_id, .. }
            | Self::BoardMemberJoined { dao_id, .. }
            | Self::PostCreated { dao_id, .. }
            | Self::ProposalCreated { dao_id, .. }
            | Self::ProposalVoted { dao_id, .. } => *dao_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DaoCreated { .. } => "DAOCreated",
            Self::MemberJoined { .. } => "MemberJoined",
            Self::BoardMemberJoined { .. } => "BoardMemberJoined",
            Self::PostCreated { .. } => "PostCreated",
            Self::ProposalCreated { .. } => "ProposalCreated",
            Self::ProposalVoted { .. } => "ProposalVoted",
        }
    }
}

/// An event with its position in the global log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub event: Event,
}

impl EventRecord {
    /// JSON rendering for external observers.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sequence": self.sequence,
            "type": self.event.name(),
            "dao_id": self.event.dao_id().as_u64(),
            "event": &self.event,
        })
    }
}

struct EmitterLog {
    next_sequence: u64,
    records: Vec<EventRecord>,
}

pub struct EventEmitter {
    log: Mutex<EmitterLog>,
    tx: broadcast::Sender<EventRecord>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        Self::with_records(capacity, Vec::new())
    }

    fn with_records(capacity: usize, records: Vec<EventRecord>) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        let next_sequence = records.last().map_or(0, |r| r.sequence + 1);
        Self {
            log: Mutex::new(EmitterLog {
                next_sequence,
                records,
            }),
            tx,
        }
    }

    /// Rebuild the retained log from stored `(sequence, record)` pairs and
    /// resume numbering after the last one.
    pub fn restore(capacity: usize, stored: Vec<(u64, Vec<u8>)>) -> Result<Self, GovernanceError> {
        let mut records: Vec<EventRecord> = Vec::with_capacity(stored.len());
        for (sequence, bytes) in stored {
            let record: EventRecord = bincode::deserialize(&bytes)?;
            if record.sequence != sequence {
                return Err(GovernanceError::Serialization(format!(
                    "event stored under {sequence} carries sequence {}",
                    record.sequence
                )));
            }
            if records.last().is_some_and(|prev| prev.sequence >= sequence) {
                return Err(GovernanceError::Serialization(format!(
                    "event sequence {sequence} is out of order"
                )));
            }
            records.push(record);
        }
        Ok(Self::with_records(capacity, records))
    }

    fn lock(&self) -> MutexGuard<'_, EmitterLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hold the next sequence number until the event is published.
    ///
    /// Other emits wait while the slot is alive, so the caller can persist
    /// the event under [`EventSlot::sequence`] before anyone else claims it.
    pub fn reserve(&self) -> EventSlot<'_> {
        EventSlot {
            log: self.lock(),
            tx: &self.tx,
        }
    }

    /// Publish an event that needs no storage; returns its sequence number.
    pub fn emit(&self, event: Event) -> u64 {
        self.reserve().publish(event)
    }

    /// Live stream of every event emitted after this call.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
            dao_id: None,
        }
    }

    /// Live stream restricted to one DAO.
    pub fn subscribe_dao(&self, dao_id: DaoId) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
            dao_id: Some(dao_id),
        }
    }

    /// The full retained log, in sequence order.
    pub fn events(&self) -> Vec<EventRecord> {
        self.lock().records.clone()
    }

    pub fn events_for(&self, dao_id: DaoId) -> Vec<EventRecord> {
        self.lock()
            .records
            .iter()
            .filter(|r| r.event.dao_id() == dao_id)
            .cloned()
            .collect()
    }

    /// Records with `sequence >= from`.
    pub fn events_since(&self, from: u64) -> Vec<EventRecord> {
        let log = self.lock();
        let start = log.records.partition_point(|r| r.sequence < from);
        log.records[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Sequence number the next event will get.
    pub fn next_sequence(&self) -> u64 {
        self.lock().next_sequence
    }
}

/// A reserved, not yet published, sequence number.
pub struct EventSlot<'a> {
    log: MutexGuard<'a, EmitterLog>,
    tx: &'a broadcast::Sender<EventRecord>,
}

impl EventSlot<'_> {
    pub fn sequence(&self) -> u64 {
        self.log.next_sequence
    }

    /// The record `event` will be published as.
    pub fn record(&self, event: Event) -> EventRecord {
        EventRecord {
            sequence: self.sequence(),
            event,
        }
    }

    /// Append `event` to the log under the reserved sequence and broadcast it.
    pub fn publish(mut self, event: Event) -> u64 {
        let record = self.record(event);
        self.log.next_sequence += 1;
        tracing::debug!(sequence = record.sequence, event = record.event.name(), dao_id = %record.event.dao_id(), "event emitted");
        // No receivers is not an error: the log still holds the record.
        let _ = self.tx.send(record.clone());
        let sequence = record.sequence;
        self.log.records.push(record);
        sequence
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// A live, optionally DAO-filtered, view of the event stream.
pub struct EventSubscription {
    rx: broadcast::Receiver<EventRecord>,
    dao_id: Option<DaoId>,
}

impl EventSubscription {
    fn matches(&self, record: &EventRecord) -> bool {
        self.dao_id.map_or(true, |id| record.event.dao_id() == id)
    }

    /// Wait for the next matching event.
    ///
    /// Returns `RecvError::Lagged` if the subscriber fell behind the channel
    /// capacity; the missed records are still in [`EventEmitter::events`].
    pub async fn recv(&mut self) -> Result<EventRecord, broadcast::error::RecvError> {
        loop {
            let record = self.rx.recv().await?;
            if self.matches(&record) {
                return Ok(record);
            }
        }
    }

    /// Next matching event if one is already buffered.
    pub fn try_recv(&mut self) -> Result<EventRecord, broadcast::error::TryRecvError> {
        loop {
            let record = self.rx.try_recv()?;
            if self.matches(&record) {
                return Ok(record);
            }
        }
    }
}
