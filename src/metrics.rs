//! Prometheus metrics for the identity layer.
//!
//! - `irc_nick_changes_total{outcome}` - rename attempts by outcome
//!   (`changed`, `unchanged`, or an error code)
//! - `irc_forced_renames_total{kind}` - server-initiated renames
//!   (`random`, `collision`)
//! - `irc_connected_clients` - logical clients currently connected
//!
//! Recording before [`init`] is a no-op.

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Rename attempts by outcome.
pub static NICK_CHANGES: OnceLock<IntCounterVec> = OnceLock::new();

/// Server-initiated renames by kind.
pub static FORCED_RENAMES: OnceLock<IntCounterVec> = OnceLock::new();

/// Currently connected clients (not sessions).
pub static CONNECTED_CLIENTS: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup; later calls are harmless.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(NICK_CHANGES, IntCounterVec::new(Opts::new("irc_nick_changes_total", "Nick change attempts by outcome"), &["outcome"]));
    register!(FORCED_RENAMES, IntCounterVec::new(Opts::new("irc_forced_renames_total", "Server-initiated renames by kind"), &["kind"]));
    register!(CONNECTED_CLIENTS, IntGauge::new("irc_connected_clients", "Currently connected clients"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record the outcome of one rename attempt.
#[inline]
pub fn record_nick_change(outcome: &str) {
    if let Some(c) = NICK_CHANGES.get() {
        c.with_label_values(&[outcome]).inc();
    }
}

/// Record a server-initiated rename.
#[inline]
pub fn record_forced_rename(kind: &str) {
    if let Some(c) = FORCED_RENAMES.get() {
        c.with_label_values(&[kind]).inc();
    }
}

#[inline]
pub fn set_connected_clients(count: usize) {
    if let Some(g) = CONNECTED_CLIENTS.get() {
        g.set(count as i64);
    }
}
