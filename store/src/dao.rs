//! DAO record storage trait.

use crate::record::RecordKey;
use crate::StoreError;

/// Read side of the per-DAO record space. Writes go through
/// [`GovernanceStore::commit`](crate::GovernanceStore::commit).
pub trait DaoStore: Send + Sync {
    fn get_record(&self, key: &RecordKey) -> Result<Option<Vec<u8>>, StoreError>;

    /// All records, in key order.
    fn iter_records(&self) -> Result<Vec<(RecordKey, Vec<u8>)>, StoreError>;

    fn record_count(&self) -> Result<u64, StoreError> {
        self.iter_records().map(|v| v.len() as u64)
    }
}
