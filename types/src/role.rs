//! Membership roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role an account holds inside one DAO.
///
/// Transitions are one-way out of `None`; `Member` and `BoardMember` are
/// mutually exclusive and never revert.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[default]
    None,
    /// Regular member: may publish posts.
    Member,
    /// Staked member: may publish posts, raise and vote on proposals.
    BoardMember { stake: u64 },
}

impl Role {
    /// Whether the account has joined in either role.
    pub fn has_joined(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn is_board_member(&self) -> bool {
        matches!(self, Self::BoardMember { .. })
    }

    /// Escrowed stake, zero for anything but a board member.
    pub fn stake(&self) -> u64 {
        match self {
            Self::BoardMember { stake } => *stake,
            _ => 0,
        }
    }

    pub fn kind(&self) -> Option<RoleKind> {
        match self {
            Self::None => None,
            Self::Member => Some(RoleKind::Member),
            Self::BoardMember { .. } => Some(RoleKind::BoardMember),
        }
    }

    /// Whether this role satisfies a requirement.
    ///
    /// Board members satisfy a `Member` requirement, not the other way round.
    pub fn satisfies(&self, required: RoleKind) -> bool {
        match required {
            RoleKind::Member => self.has_joined(),
            RoleKind::BoardMember => self.is_board_member(),
        }
    }
}

/// A role without its payload, used to state requirements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Member,
    BoardMember,
}

impl RoleKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::BoardMember => "board member",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
