use caves_store::StoreError;
use caves_token::TokenError;
use caves_types::{AccountId, DaoId, DaoRef, RoleKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("DAO {0} not found")]
    DaoNotFound(DaoRef),

    #[error("proposal {index} not found in DAO {dao_id}")]
    ProposalNotFound { dao_id: DaoId, index: u64 },

    #[error("post {index} not found in DAO {dao_id}")]
    PostNotFound { dao_id: DaoId, index: u64 },

    #[error("a DAO named {0:?} already exists")]
    DuplicateName(String),

    #[error("DAO name must not be empty")]
    InvalidName,

    #[error("account is already a member of this DAO")]
    AlreadyMember,

    #[error("account is already a board member of this DAO")]
    AlreadyBoardMember,

    #[error("account {account} must be a {required} of this DAO")]
    Unauthorized { account: AccountId, required: RoleKind },

    #[error("account {0} has already voted on this proposal")]
    AlreadyVoted(AccountId),

    #[error("stake of {offered} does not meet the board requirement of {required}")]
    InsufficientStake { required: u64, offered: u64 },

    #[error("stake escrow failed: {0}")]
    EscrowFailed(#[source] TokenError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Coarse error classification for callers that only branch on the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    DuplicateName,
    InvalidName,
    AlreadyMember,
    AlreadyBoardMember,
    Unauthorized,
    AlreadyVoted,
    InsufficientStake,
    EscrowFailed,
    Storage,
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DaoNotFound(_) | Self::ProposalNotFound { .. } | Self::PostNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::DuplicateName(_) => ErrorKind::DuplicateName,
            Self::InvalidName => ErrorKind::InvalidName,
            Self::AlreadyMember => ErrorKind::AlreadyMember,
            Self::AlreadyBoardMember => ErrorKind::AlreadyBoardMember,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::AlreadyVoted(_) => ErrorKind::AlreadyVoted,
            Self::InsufficientStake { .. } => ErrorKind::InsufficientStake,
            Self::EscrowFailed(_) => ErrorKind::EscrowFailed,
            Self::Store(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }
}

impl From<bincode::Error> for GovernanceError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
