//! LMDB implementation of the governance store.
//!
//! Records live in the `records` database under their 25-byte
//! [`RecordKey`]; events in `events` under a big-endian `u64` sequence.
//! A [`WriteBatch`] is applied inside a single write transaction, so a DAO
//! mutation and its event land together or not at all.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use caves_store::{DaoStore, EventStore, GovernanceStore, RecordKey, StoreError, WriteBatch};

use crate::LmdbError;

pub struct LmdbGovernanceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) records_db: Database<Bytes, Bytes>,
    pub(crate) events_db: Database<Bytes, Bytes>,
}

fn decode_sequence(key: &[u8]) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = key
        .try_into()
        .map_err(|_| LmdbError::Corruption(format!("event key of length {}", key.len())))?;
    Ok(u64::from_be_bytes(arr))
}

impl DaoStore for LmdbGovernanceStore {
    fn get_record(&self, key: &RecordKey) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .records_db
            .get(&rtxn, &key.to_bytes())
            .map_err(LmdbError::from)?
            .map(|b| b.to_vec());
        Ok(val)
    }

    fn iter_records(&self) -> Result<Vec<(RecordKey, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in self.records_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, val) = entry.map_err(LmdbError::from)?;
            results.push((RecordKey::from_bytes(key)?, val.to_vec()));
        }
        Ok(results)
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.records_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

impl EventStore for LmdbGovernanceStore {
    fn iter_events(&self) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in self.events_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, val) = entry.map_err(LmdbError::from)?;
            results.push((decode_sequence(key)?, val.to_vec()));
        }
        Ok(results)
    }

    fn event_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.events_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

impl GovernanceStore for LmdbGovernanceStore {
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        // Dropping the transaction on any early return aborts it.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for (key, data) in batch.records() {
            self.records_db
                .put(&mut wtxn, &key.to_bytes(), data)
                .map_err(LmdbError::from)?;
        }
        for (sequence, data) in batch.events() {
            let key = sequence.to_be_bytes();
            if self
                .events_db
                .get(&wtxn, &key)
                .map_err(LmdbError::from)?
                .is_some()
            {
                return Err(LmdbError::Duplicate(format!("event {sequence}")).into());
            }
            self.events_db
                .put(&mut wtxn, &key, data)
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
