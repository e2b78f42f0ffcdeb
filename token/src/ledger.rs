//! The capability the governance engine consumes.

use crate::TokenError;
use caves_types::AccountId;

/// Balance and escrow primitives of a fungible-token ledger.
///
/// Every call is atomic and totally ordered with respect to other calls on
/// the same ledger.
pub trait TokenLedger: Send + Sync {
    /// Current balance of `account` (zero for unknown accounts).
    fn balance_of(&self, account: &AccountId) -> u64;

    /// Move `amount` from `owner` to `spender`, consuming the allowance
    /// `owner` granted to `spender`.
    fn transfer_from(
        &self,
        owner: &AccountId,
        spender: &AccountId,
        amount: u64,
    ) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` on `from`'s own authority.
    fn transfer(&self, from: &AccountId, to: &AccountId, amount: u64) -> Result<(), TokenError>;
}

impl<L: TokenLedger + ?Sized> TokenLedger for std::sync::Arc<L> {
    fn balance_of(&self, account: &AccountId) -> u64 {
        (**self).balance_of(account)
    }

    fn transfer_from(
        &self,
        owner: &AccountId,
        spender: &AccountId,
        amount: u64,
    ) -> Result<(), TokenError> {
        (**self).transfer_from(owner, spender, amount)
    }

    fn transfer(&self, from: &AccountId, to: &AccountId, amount: u64) -> Result<(), TokenError> {
        (**self).transfer(from, to, amount)
    }
}
