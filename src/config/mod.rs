//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Root config struct and loading (Config, ServerConfig, LoggingConfig)
//! - [`limits`]: Identity limits (nick length, WHOWAS and MONITOR capacities)
//! - [`accounts`]: Nickname reservation and account/nick binding policy
//! - [`multiclient`]: Bouncer session policy
//! - [`history`]: In-memory history buffer sizing
//! - [`validation`]: Startup validation of the loaded values

mod accounts;
mod history;
mod limits;
mod multiclient;
mod types;
mod validation;

pub use accounts::{AccountsConfig, EnforcementMethod, NickReservationConfig};
pub use history::HistoryConfig;
pub use limits::{LimitsConfig, MIN_NICKLEN};
pub use multiclient::MulticlientConfig;
pub use types::{Config, ConfigError, LogFormat, LoggingConfig, ServerConfig};
pub use validation::{ValidationError, validate};
