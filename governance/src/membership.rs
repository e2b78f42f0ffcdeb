//! Per-DAO membership registry.
//!
//! One role per account. Admission moves an account out of `Role::None`
//! exactly once; there is no leave or downgrade path.

use std::collections::HashMap;

use caves_types::{AccountId, DaoId, Role, RoleKind};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// A membership as seen by queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub dao_id: DaoId,
    pub account: AccountId,
    pub role: Role,
}

#[derive(Clone, Debug, Default)]
pub struct MembershipBook {
    roles: HashMap<AccountId, Role>,
    /// Board members in admission order.
    board: Vec<AccountId>,
}

impl MembershipBook {
    pub fn role_of(&self, account: &AccountId) -> Role {
        self.roles.get(account).copied().unwrap_or_default()
    }

    /// Fails if `account` already holds either role.
    pub fn ensure_can_join(&self, account: &AccountId) -> Result<(), GovernanceError> {
        match self.role_of(account) {
            Role::None => Ok(()),
            Role::Member => Err(GovernanceError::AlreadyMember),
            Role::BoardMember { .. } => Err(GovernanceError::AlreadyBoardMember),
        }
    }

    /// Fails with `Unauthorized` unless `account` satisfies `required`.
    pub fn require(&self, account: &AccountId, required: RoleKind) -> Result<Role, GovernanceError> {
        let role = self.role_of(account);
        if !role.satisfies(required) {
            return Err(GovernanceError::Unauthorized {
                account: account.clone(),
                required,
            });
        }
        Ok(role)
    }

    /// Admission ordinal the next account will receive.
    pub fn next_ordinal(&self) -> u64 {
        self.roles.len() as u64
    }

    /// Record an admission already checked with [`Self::ensure_can_join`].
    pub(crate) fn insert(&mut self, account: AccountId, role: Role) {
        if role.is_board_member() {
            self.board.push(account.clone());
        }
        self.roles.insert(account, role);
    }

    pub fn admit_member(&mut self, account: AccountId) -> Result<(), GovernanceError> {
        self.ensure_can_join(&account)?;
        self.insert(account, Role::Member);
        Ok(())
    }

    /// Record a board member whose stake has already been escrowed.
    pub fn admit_board_member(
        &mut self,
        account: AccountId,
        stake: u64,
    ) -> Result<(), GovernanceError> {
        self.ensure_can_join(&account)?;
        self.insert(account, Role::BoardMember { stake });
        Ok(())
    }

    /// Board members and their stakes, in admission order.
    pub fn board_members(&self) -> Vec<(AccountId, u64)> {
        self.board
            .iter()
            .map(|a| (a.clone(), self.role_of(a).stake()))
            .collect()
    }

    /// Sum of all escrowed stakes held for this DAO.
    pub fn total_staked(&self) -> u64 {
        self.roles
            .values()
            .map(Role::stake)
            .fold(0u64, u64::saturating_add)
    }

    /// Number of accounts holding either role.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn records(&self, dao_id: DaoId) -> Vec<MembershipRecord> {
        let mut records: Vec<_> = self
            .roles
            .iter()
            .map(|(account, role)| MembershipRecord {
                dao_id,
                account: account.clone(),
                role: *role,
            })
            .collect();
        records.sort_by(|a, b| a.account.cmp(&b.account));
        records
    }
}
