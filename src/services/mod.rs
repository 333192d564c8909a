//! Services collaborating with the identity layer.
//!
//! - [`accounts`]: nickname reservations by registered accounts
//! - [`enforce`]: background renaming of clients squatting reserved nicks

pub mod accounts;
pub mod enforce;

pub use accounts::{AccountStore, MemoryAccounts};
