//! Event log storage trait.

use crate::StoreError;

/// Read side of the append-only event log keyed by sequence number.
pub trait EventStore: Send + Sync {
    /// All events, ordered by sequence.
    fn iter_events(&self) -> Result<Vec<(u64, Vec<u8>)>, StoreError>;

    fn event_count(&self) -> Result<u64, StoreError> {
        self.iter_events().map(|v| v.len() as u64)
    }
}
