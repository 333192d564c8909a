//! slircd-identity - identity layer of the Straylight IRC Daemon.
//!
//! Nickname uniqueness under concurrency: the [`NickRegistry`](state::NickRegistry)
//! owns the canonical-nick map, the rename orchestrator in [`handlers`]
//! sequences validation, commit, fan-out and history, and bouncer clients
//! with several sessions all observe the same identity.
//!
//! Normalization lives in the `slirc-casefold` crate.

pub mod config;
pub mod error;
pub mod handlers;
pub mod history;
pub mod message;
pub mod metrics;
pub mod services;
pub mod state;

pub use error::NickError;
pub use state::Matrix;
