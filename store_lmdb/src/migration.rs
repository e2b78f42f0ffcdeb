//! Schema version check.
//!
//! Tracks a monotonically increasing schema version in the meta database.
//! A fresh database is stamped with the current version; a database written
//! by a newer build is refused.

use crate::meta::LmdbMetaStore;
use crate::LmdbError;

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub struct Migrator;

impl Migrator {
    pub fn run(meta: &LmdbMetaStore) -> Result<(), LmdbError> {
        let current = meta.schema_version()?;

        if current == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = current, "database schema is up to date");
            return Ok(());
        }

        if current > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Corruption(format!(
                "database schema version {current} is newer than supported version {CURRENT_SCHEMA_VERSION}"
            )));
        }

        // Only version 0 (fresh) exists below the current version.
        tracing::info!(from = current, to = CURRENT_SCHEMA_VERSION, "stamping schema version");
        meta.set_schema_version(CURRENT_SCHEMA_VERSION)
    }
}
