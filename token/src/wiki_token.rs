//! In-process fungible token ledger.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use caves_types::AccountId;
use serde::{Deserialize, Serialize};

use crate::{TokenError, TokenLedger};

/// Access-control roles on the token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenRole {
    /// May grant roles.
    Admin,
    /// May mint new supply.
    Minter,
}

impl fmt::Display for TokenRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Minter => f.write_str("minter"),
        }
    }
}

#[derive(Default)]
struct LedgerState {
    total_supply: u64,
    balances: HashMap<AccountId, u64>,
    /// (owner, spender) → remaining allowance.
    allowances: HashMap<(AccountId, AccountId), u64>,
    roles: HashMap<TokenRole, HashSet<AccountId>>,
}

impl LedgerState {
    fn balance(&self, account: &AccountId) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u64 {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn has_role(&self, role: TokenRole, account: &AccountId) -> bool {
        self.roles.get(&role).is_some_and(|set| set.contains(account))
    }

    /// Validate fully before touching either balance.
    fn move_balance(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TokenError> {
        let available = self.balance(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

/// A fixed-supply token with allowances and role-gated minting.
///
/// The owner passed to [`WikiToken::new`] receives the whole initial supply
/// and both the admin and minter roles.
pub struct WikiToken {
    state: Mutex<LedgerState>,
}

impl WikiToken {
    pub fn new(owner: AccountId, initial_supply: u64) -> Self {
        let mut state = LedgerState {
            total_supply: initial_supply,
            ..Default::default()
        };
        state.balances.insert(owner.clone(), initial_supply);
        for role in [TokenRole::Admin, TokenRole::Minter] {
            state.roles.entry(role).or_default().insert(owner.clone());
        }
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn total_supply(&self) -> u64 {
        self.lock().total_supply
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u64 {
        self.lock().allowance(owner, spender)
    }

    /// Set (not add to) the amount `spender` may move out of `owner`'s balance.
    pub fn approve(&self, owner: &AccountId, spender: &AccountId, amount: u64) {
        self.lock()
            .allowances
            .insert((owner.clone(), spender.clone()), amount);
        tracing::debug!(%owner, %spender, amount, "allowance set");
    }

    /// Create `amount` new tokens for `to`. `caller` must hold [`TokenRole::Minter`].
    pub fn mint(&self, caller: &AccountId, to: &AccountId, amount: u64) -> Result<(), TokenError> {
        let mut state = self.lock();
        if !state.has_role(TokenRole::Minter, caller) {
            return Err(TokenError::MissingRole(TokenRole::Minter));
        }
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = state
            .balance(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        state.total_supply = supply;
        state.balances.insert(to.clone(), balance);
        tracing::debug!(%to, amount, "minted");
        Ok(())
    }

    /// Grant `role` to `account`. `caller` must hold [`TokenRole::Admin`].
    pub fn grant_role(
        &self,
        caller: &AccountId,
        role: TokenRole,
        account: &AccountId,
    ) -> Result<(), TokenError> {
        let mut state = self.lock();
        if !state.has_role(TokenRole::Admin, caller) {
            return Err(TokenError::MissingRole(TokenRole::Admin));
        }
        state.roles.entry(role).or_default().insert(account.clone());
        Ok(())
    }

    pub fn has_role(&self, role: TokenRole, account: &AccountId) -> bool {
        self.lock().has_role(role, account)
    }
}

impl TokenLedger for WikiToken {
    fn balance_of(&self, account: &AccountId) -> u64 {
        self.lock().balance(account)
    }

    fn transfer_from(
        &self,
        owner: &AccountId,
        spender: &AccountId,
        amount: u64,
    ) -> Result<(), TokenError> {
        let mut state = self.lock();
        let allowed = state.allowance(owner, spender);
        if allowed < amount {
            return Err(TokenError::NotAuthorized {
                needed: amount,
                allowed,
            });
        }
        state.move_balance(owner, spender, amount)?;
        state
            .allowances
            .insert((owner.clone(), spender.clone()), allowed - amount);
        tracing::debug!(%owner, %spender, amount, "transfer_from");
        Ok(())
    }

    fn transfer(&self, from: &AccountId, to: &AccountId, amount: u64) -> Result<(), TokenError> {
        self.lock().move_balance(from, to, amount)?;
        tracing::debug!(%from, %to, amount, "transfer");
        Ok(())
    }
}
