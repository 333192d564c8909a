//! In-memory history buffer configuration.

use serde::Deserialize;

use super::types::default_true;

/// History configuration.
///
/// Channel and client histories are fixed-capacity rings; nothing is
/// persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Whether history is recorded at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Items kept per channel (default: 1024).
    #[serde(default = "default_channel_length")]
    pub channel_length: usize,
    /// Items kept per client (default: 256).
    #[serde(default = "default_client_length")]
    pub client_length: usize,
    /// Items replayed to a session when it joins a channel (default: 0).
    #[serde(default)]
    pub autoreplay_on_join: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_length: default_channel_length(),
            client_length: default_client_length(),
            autoreplay_on_join: 0,
        }
    }
}

impl HistoryConfig {
    /// Per-channel capacity, zero when history is disabled.
    pub fn channel_length(&self) -> usize {
        if self.enabled { self.channel_length } else { 0 }
    }

    /// Per-client capacity, zero when history is disabled.
    pub fn client_length(&self) -> usize {
        if self.enabled { self.client_length } else { 0 }
    }
}

fn default_channel_length() -> usize {
    1024
}

fn default_client_length() -> usize {
    256
}
