//! State management module.
//!
//! Contains the Matrix (shared server state) and the entities it owns.

mod channel;
mod client;
pub mod lock_order;
pub mod managers;
mod matrix;
mod snomask;

pub use channel::{Channel, Member};
pub use client::{Client, ClientId, IdentitySnapshot, NO_NICK, Session, SessionId};
pub use managers::channel::{ChannelManager, JoinOutcome};
pub use managers::client::{AttachResult, ClientManager, DetachResult};
pub use managers::monitor::{MonitorError, MonitorManager};
pub use managers::nick::{NickChange, NickPolicy, NickRegistry};
pub use managers::whowas::{WhowasEntry, WhowasList};
pub use matrix::Matrix;
pub use snomask::Snomask;
