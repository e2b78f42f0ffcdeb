//! Nullable store: thread-safe in-memory storage for testing.

use caves_store::{DaoStore, EventStore, GovernanceStore, RecordKey, StoreError, WriteBatch};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Contents {
    records: BTreeMap<RecordKey, Vec<u8>>,
    events: BTreeMap<u64, Vec<u8>>,
}

/// An in-memory record + event store for testing.
///
/// Thread-safe. Commits can be made to fail on demand to exercise the
/// engine's rollback paths.
pub struct NullStore {
    contents: Mutex<Contents>,
    fail_commits: AtomicBool,
    commits: AtomicU64,
    last_commit_bytes: AtomicU64,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            contents: Mutex::new(Contents::default()),
            fail_commits: AtomicBool::new(false),
            commits: AtomicU64::new(0),
            last_commit_bytes: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Contents> {
        self.contents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent `commit` fail (or succeed again).
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Record payload bytes written by the most recent successful commit.
    pub fn last_commit_bytes(&self) -> u64 {
        self.last_commit_bytes.load(Ordering::SeqCst)
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DaoStore for NullStore {
    fn get_record(&self, key: &RecordKey) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock().records.get(key).cloned())
    }

    fn iter_records(&self) -> Result<Vec<(RecordKey, Vec<u8>)>, StoreError> {
        Ok(self
            .lock()
            .records
            .iter()
            .map(|(key, data)| (*key, data.clone()))
            .collect())
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock().records.len() as u64)
    }
}

impl EventStore for NullStore {
    fn iter_events(&self) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        Ok(self
            .lock()
            .events
            .iter()
            .map(|(seq, data)| (*seq, data.clone()))
            .collect())
    }

    fn event_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock().events.len() as u64)
    }
}

impl GovernanceStore for NullStore {
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        let mut contents = self.lock();
        // Validate before touching anything so a rejected batch writes nothing.
        for (sequence, _) in batch.events() {
            if contents.events.contains_key(sequence) {
                return Err(StoreError::Duplicate(format!("event {sequence}")));
            }
        }
        for (key, data) in batch.records() {
            contents.records.insert(*key, data.clone());
        }
        for (sequence, data) in batch.events() {
            contents.events.insert(*sequence, data.clone());
        }
        let bytes: usize = batch.records().iter().map(|(_, data)| data.len()).sum();
        self.last_commit_bytes.store(bytes as u64, Ordering::SeqCst);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
