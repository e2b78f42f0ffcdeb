//! Write batching: a DAO mutation and the event describing it are committed
//! together or not at all.

use crate::record::RecordKey;
use crate::{DaoStore, EventStore, StoreError};

/// Records and events to be written in one transaction.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    records: Vec<(RecordKey, Vec<u8>)>,
    events: Vec<(u64, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn put_record(&mut self, key: RecordKey, data: Vec<u8>) {
        self.records.push((key, data));
    }

    /// Append an event; the commit fails if `sequence` is already stored.
    pub fn put_event(&mut self, sequence: u64, data: Vec<u8>) {
        self.events.push((sequence, data));
    }

    pub fn records(&self) -> &[(RecordKey, Vec<u8>)] {
        &self.records
    }

    pub fn events(&self) -> &[(u64, Vec<u8>)] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.events.is_empty()
    }
}

/// A store holding both DAO records and the event log, able to commit a
/// [`WriteBatch`] atomically across the two.
pub trait GovernanceStore: DaoStore + EventStore {
    /// Apply every write in `batch`, or none of them.
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError>;
}
