//! Nickname registry.
//!
//! The `NickRegistry` is the only owner of the canonical-nick → client
//! mapping. Every rename is a single transaction under one
//! `parking_lot::Mutex` at [`LockLevel::Registry`]: validation, the
//! uniqueness check and the commit all happen before the lock is released,
//! so two renamers can never both claim the same key. The identity being
//! vacated is captured inside the same transaction.

use parking_lot::{Mutex, MutexGuard};
use slirc_casefold::casefold_identity;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::{Config, EnforcementMethod};
use crate::error::NickError;
use crate::services::AccountStore;
use crate::state::client::{Client, IdentitySnapshot, NO_NICK};
use crate::state::lock_order::{Leveled, LockLevel};

/// Protocol-internal names that can never be taken.
const RESTRICTED_NICKS: [&str; 2] = ["=scene=", "--"];

/// Outcome of a successful [`NickRegistry::set_nick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NickChange {
    /// The client now holds `nick`.
    Changed {
        nick: String,
        nick_cf: String,
        /// The identity this change replaced, as it was at commit time.
        previous: IdentitySnapshot,
        /// The nick is reserved by an account the client is not logged in
        /// to and enforcement is deferred to the rename timer.
        needs_enforcement: bool,
    },
    /// The client already holds this canonical key, or has been destroyed;
    /// nothing happened.
    Unchanged,
}

/// Naming policy applied inside the registry transaction.
#[derive(Debug, Clone)]
pub struct NickPolicy {
    pub nicklen: usize,
    /// Casefolded names nobody may hold.
    pub restricted: HashSet<String>,
    pub method: EnforcementMethod,
    pub force_nick_equals_account: bool,
}

impl NickPolicy {
    pub fn from_config(config: &Config) -> Self {
        let reservation = &config.accounts.nick_reservation;
        let restricted = RESTRICTED_NICKS
            .iter()
            .map(|nick| nick.to_string())
            .chain(
                reservation
                    .reserved_nicks
                    .iter()
                    .filter_map(|nick| casefold_identity(nick).ok()),
            )
            .collect();

        Self {
            nicklen: config.limits.nicklen,
            restricted,
            method: reservation.effective_method(),
            force_nick_equals_account: reservation.force_nick_equals_account,
        }
    }
}

/// The canonical-nick → client map.
pub struct NickRegistry {
    nicks: Mutex<HashMap<String, Arc<Client>>>,
    policy: NickPolicy,
    accounts: Arc<dyn AccountStore>,
}

impl NickRegistry {
    pub fn new(policy: NickPolicy, accounts: Arc<dyn AccountStore>) -> Self {
        Self {
            nicks: Mutex::new(HashMap::new()),
            policy,
            accounts,
        }
    }

    fn lock(&self) -> Leveled<MutexGuard<'_, HashMap<String, Arc<Client>>>> {
        Leveled::acquire(LockLevel::Registry, || self.nicks.lock())
    }

    pub fn policy(&self) -> &NickPolicy {
        &self.policy
    }

    /// Give `target` the nickname `requested`.
    ///
    /// Validation, the uniqueness check and the commit run as one
    /// transaction; on error nothing has changed. A destroyed target is
    /// never given a key.
    pub fn set_nick(&self, target: &Arc<Client>, requested: &str) -> Result<NickChange, NickError> {
        let mut nicks = self.lock();

        let mut nick = requested.trim().to_string();
        if nick.is_empty() && self.policy.force_nick_equals_account {
            nick = target.account().unwrap_or_default();
        }
        if nick.is_empty() {
            return Err(NickError::NickMissing);
        }

        if nick == NO_NICK || nick.chars().count() > self.policy.nicklen {
            return Err(NickError::NicknameInvalid(nick));
        }
        let Ok(nick_cf) = casefold_identity(&nick) else {
            return Err(NickError::NicknameInvalid(nick));
        };
        if self.policy.restricted.contains(&nick_cf) {
            return Err(NickError::NicknameInvalid(nick));
        }

        if let Some(holder) = nicks.get(&nick_cf) {
            if holder.id() != target.id() {
                return Err(NickError::NicknameInUse(nick));
            }
            return Ok(NickChange::Unchanged);
        }

        let account_cf = target.account_cf();
        if self.policy.force_nick_equals_account
            && let Some(account_cf) = &account_cf
            && *account_cf != nick_cf
        {
            return Err(NickError::AccountMismatch(nick));
        }

        let mut needs_enforcement = false;
        if self.policy.method != EnforcementMethod::None
            && let Some(owner) = self.accounts.reserved_by(&nick_cf)
            && account_cf.as_deref() != Some(owner.as_str())
        {
            if self.policy.method == EnforcementMethod::Strict {
                return Err(NickError::AccountMismatch(nick));
            }
            needs_enforcement = true;
        }

        let Some(previous) = target.assign_nick(nick.clone(), nick_cf.clone()) else {
            return Ok(NickChange::Unchanged);
        };
        if previous.has_nick()
            && nicks
                .get(&previous.nick_cf)
                .is_some_and(|holder| holder.id() == target.id())
        {
            nicks.remove(&previous.nick_cf);
        }
        nicks.insert(nick_cf.clone(), Arc::clone(target));

        Ok(NickChange::Changed {
            nick,
            nick_cf,
            previous,
            needs_enforcement,
        })
    }

    /// Release `client`'s nickname, returning the freed canonical key.
    pub fn release(&self, client: &Arc<Client>) -> Option<String> {
        let mut nicks = self.lock();
        let nick_cf = client.nick_cf();
        let held = nicks
            .get(&nick_cf)
            .is_some_and(|holder| holder.id() == client.id());
        if !held {
            return None;
        }
        nicks.remove(&nick_cf);
        client.clear_nick();
        Some(nick_cf)
    }

    /// Look up the holder of `nick`.
    pub fn get(&self, nick: &str) -> Option<Arc<Client>> {
        let nick_cf = casefold_identity(nick).ok()?;
        self.get_cf(&nick_cf)
    }

    /// Look up the holder of an already-casefolded key.
    pub fn get_cf(&self, nick_cf: &str) -> Option<Arc<Client>> {
        self.lock().get(nick_cf).cloned()
    }

    /// Whether the nick is reserved by an account other than `account_cf`.
    pub fn reserved_for_other(&self, nick_cf: &str, account_cf: Option<&str>) -> bool {
        self.accounts
            .reserved_by(nick_cf)
            .is_some_and(|owner| account_cf != Some(owner.as_str()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every registered canonical key.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}
