//! DAO registry: identifier allocation, name uniqueness, lookup.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use caves_types::{DaoId, DaoRef};

use crate::dao::DaoState;
use crate::error::GovernanceError;

/// Handle to one DAO's state. Holding the lock serializes every operation
/// on that DAO.
pub type DaoHandle = Arc<Mutex<DaoState>>;

/// Maps DAO ids and names to their state.
///
/// Entries are only ever added. Name uniqueness and id allocation are
/// atomic as long as the caller holds the registry exclusively while
/// calling [`DaoRegistry::check_name`] and [`DaoRegistry::insert`].
pub struct DaoRegistry {
    by_id: BTreeMap<DaoId, DaoHandle>,
    by_name: HashMap<String, DaoId>,
    next_id: DaoId,
}

impl DaoRegistry {
    pub fn new() -> Self {
        Self {
            by_id: BTreeMap::new(),
            by_name: HashMap::new(),
            next_id: DaoId::FIRST,
        }
    }

    /// Rebuild from persisted states. Ids continue after the largest one seen.
    pub fn from_states(states: impl IntoIterator<Item = DaoState>) -> Result<Self, GovernanceError> {
        let mut registry = Self::new();
        for state in states {
            registry.check_name(&state.dao.name)?;
            registry.insert(state);
        }
        Ok(registry)
    }

    /// Fails if `name` is blank or already registered.
    pub fn check_name(&self, name: &str) -> Result<(), GovernanceError> {
        if name.trim().is_empty() {
            return Err(GovernanceError::InvalidName);
        }
        if self.by_name.contains_key(name) {
            return Err(GovernanceError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// The id the next created DAO will receive.
    pub fn next_id(&self) -> DaoId {
        self.next_id
    }

    pub fn insert(&mut self, state: DaoState) -> DaoHandle {
        let id = state.id();
        self.by_name.insert(state.dao.name.clone(), id);
        if id >= self.next_id {
            self.next_id = id.next().unwrap_or(id);
        }
        let handle = Arc::new(Mutex::new(state));
        self.by_id.insert(id, Arc::clone(&handle));
        handle
    }

    pub fn resolve(&self, dao: &DaoRef) -> Result<DaoId, GovernanceError> {
        let id = match dao {
            DaoRef::Id(id) => self.by_id.contains_key(id).then_some(*id),
            DaoRef::Name(name) => self.by_name.get(name).copied(),
        };
        id.ok_or_else(|| GovernanceError::DaoNotFound(dao.clone()))
    }

    pub fn get(&self, dao: &DaoRef) -> Result<DaoHandle, GovernanceError> {
        let id = self.resolve(dao)?;
        self.by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| GovernanceError::DaoNotFound(dao.clone()))
    }

    /// All handles in id order.
    pub fn handles(&self) -> Vec<DaoHandle> {
        self.by_id.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for DaoRegistry {
    fn default() -> Self {
        Self::new()
    }
}
