//! Account collaborator.
//!
//! Credential checks live elsewhere; the identity layer only needs to know
//! which account, if any, has reserved a nickname.

use dashmap::DashMap;
use slirc_casefold::casefold_identity;

/// Nickname reservations held by registered accounts.
pub trait AccountStore: Send + Sync {
    /// Casefolded account that reserves the casefolded nick `nick_cf`.
    fn reserved_by(&self, nick_cf: &str) -> Option<String>;
}

/// In-memory reservation table.
#[derive(Debug, Default)]
pub struct MemoryAccounts {
    reservations: DashMap<String, String>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `nick` for `account`. Returns `false` if either name has no
    /// canonical form.
    pub fn reserve(&self, nick: &str, account: &str) -> bool {
        let (Ok(nick_cf), Ok(account_cf)) = (casefold_identity(nick), casefold_identity(account))
        else {
            return false;
        };
        self.reservations.insert(nick_cf, account_cf);
        true
    }

    /// Drop the reservation on `nick`, returning the owning account.
    pub fn release(&self, nick: &str) -> Option<String> {
        let nick_cf = casefold_identity(nick).ok()?;
        self.reservations.remove(&nick_cf).map(|(_, account)| account)
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}

impl AccountStore for MemoryAccounts {
    fn reserved_by(&self, nick_cf: &str) -> Option<String> {
        self.reservations.get(nick_cf).map(|entry| entry.value().clone())
    }
}
