//! Identity limits configuration.

use serde::Deserialize;

/// Shortest usable `nicklen`: one base character plus the `-` and eight
/// hex digits of a nick derived during collision recovery.
pub const MIN_NICKLEN: usize = 10;

/// Limits on nickname length and the bounded identity buffers.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum nickname length in characters (default: 32).
    #[serde(default = "default_nicklen")]
    pub nicklen: usize,
    /// WHOWAS ring buffer capacity (default: 100).
    #[serde(default = "default_whowas_entries")]
    pub whowas_entries: usize,
    /// Maximum MONITOR targets per client (default: 100).
    #[serde(default = "default_monitor_entries")]
    pub monitor_entries: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            nicklen: default_nicklen(),
            whowas_entries: default_whowas_entries(),
            monitor_entries: default_monitor_entries(),
        }
    }
}

fn default_nicklen() -> usize {
    32
}

fn default_whowas_entries() -> usize {
    100
}

fn default_monitor_entries() -> usize {
    100
}
