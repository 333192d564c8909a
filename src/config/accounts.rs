//! Nickname reservation policy.
//!
//! Registered accounts may reserve nicknames. How strongly the reservation
//! is enforced against clients that are not logged in to the owning account
//! is controlled by [`EnforcementMethod`].

use serde::Deserialize;
use std::time::Duration;

use super::types::default_true;

/// Account-related configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountsConfig {
    /// Nickname reservation and account/nick binding.
    #[serde(default)]
    pub nick_reservation: NickReservationConfig,
}

/// Nickname reservation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NickReservationConfig {
    /// Honour account nickname reservations at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How a reserved nickname is enforced.
    #[serde(default)]
    pub method: EnforcementMethod,
    /// Grace period before a client squatting a reserved nick is renamed
    /// (`timeout` method only).
    #[serde(default = "default_rename_timeout_secs")]
    pub rename_timeout_secs: u64,
    /// Template for guest nicknames; the first `*` is replaced by a random token.
    #[serde(default = "default_guest_nickname_format")]
    pub guest_nickname_format: String,
    /// Logged-in clients must use their account name as their nickname.
    #[serde(default)]
    pub force_nick_equals_account: bool,
    /// Additional nicknames nobody may take.
    #[serde(default)]
    pub reserved_nicks: Vec<String>,
}

/// Enforcement of reserved nicknames.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMethod {
    /// Reservations are advisory only.
    None,
    /// The nick may be taken, but the client is renamed after a grace period
    /// unless it logs in.
    Timeout,
    /// The nick is refused outright.
    #[default]
    Strict,
}

impl Default for NickReservationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            method: EnforcementMethod::default(),
            rename_timeout_secs: default_rename_timeout_secs(),
            guest_nickname_format: default_guest_nickname_format(),
            force_nick_equals_account: false,
            reserved_nicks: Vec::new(),
        }
    }
}

impl NickReservationConfig {
    /// The method actually in force, folding `enabled = false` into `None`.
    pub fn effective_method(&self) -> EnforcementMethod {
        if self.enabled {
            self.method
        } else {
            EnforcementMethod::None
        }
    }

    /// Grace period for the `timeout` method.
    pub fn rename_timeout(&self) -> Duration {
        Duration::from_secs(self.rename_timeout_secs)
    }

    /// Substitute `token` into the guest nickname template.
    pub fn guest_nick(&self, token: &str) -> String {
        self.guest_nickname_format.replacen('*', token, 1)
    }
}

fn default_rename_timeout_secs() -> u64 {
    30
}

fn default_guest_nickname_format() -> String {
    "Guest-*".to_string()
}
