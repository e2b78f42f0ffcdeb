//! DAO identifiers.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric DAO identifier. Allocated sequentially by the registry, first id is 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DaoId(u64);

impl DaoId {
    /// The first id the registry hands out.
    pub const FIRST: Self = Self(1);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The id allocated after this one, or `None` on overflow.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Big-endian key bytes; sort order matches numeric order.
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for DaoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A DAO given either by numeric id or by its unique name.
///
/// Every engine operation accepts either form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DaoRef {
    Id(DaoId),
    Name(String),
}

impl fmt::Display for DaoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name:?}"),
        }
    }
}

impl From<DaoId> for DaoRef {
    fn from(id: DaoId) -> Self {
        Self::Id(id)
    }
}

impl From<&DaoId> for DaoRef {
    fn from(id: &DaoId) -> Self {
        Self::Id(*id)
    }
}

impl From<&str> for DaoRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for DaoRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&DaoRef> for DaoRef {
    fn from(r: &DaoRef) -> Self {
        r.clone()
    }
}

/// `#<n>` parses as an id, anything else non-empty as a name.
impl FromStr for DaoRef {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(TypesError::InvalidDaoRef(s.to_string()));
        }
        match s.strip_prefix('#') {
            Some(digits) => digits
                .parse::<u64>()
                .map(|n| Self::Id(DaoId::new(n)))
                .map_err(|_| TypesError::InvalidDaoRef(s.to_string())),
            None => Ok(Self::Name(s.to_string())),
        }
    }
}
