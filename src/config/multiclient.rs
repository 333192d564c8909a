//! Multiclient/bouncer configuration.
//!
//! A logged-in client may have several transport sessions attached at once.
//! Each session sees the same nickname, channels and history.

use serde::Deserialize;

use super::types::default_true;

/// Multiclient configuration for bouncer sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct MulticlientConfig {
    /// Enable multiclient support (the bouncer flag).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Allow multiclient by default, or require a per-account opt-in.
    #[serde(default = "default_true")]
    pub allowed_by_default: bool,

    /// Maximum concurrent sessions per client.
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_client: usize,
}

impl Default for MulticlientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_by_default: true,
            max_sessions_per_client: default_max_sessions(),
        }
    }
}

impl MulticlientConfig {
    /// Check if multiclient is enabled for a given account.
    ///
    /// Takes the per-account setting if set, otherwise uses the config default.
    pub fn is_multiclient_enabled(&self, account_setting: Option<bool>) -> bool {
        if !self.enabled {
            return false;
        }
        account_setting.unwrap_or(self.allowed_by_default)
    }
}

fn default_max_sessions() -> usize {
    10
}
