//! Domain managers for server state.
//!
//! Each manager owns one domain of the shared state. The Matrix wires them
//! together; managers never call each other directly.

pub mod channel;
pub mod client;
pub mod monitor;
pub mod nick;
pub mod whowas;
