//! # slirc-casefold
//!
//! Canonical comparison keys for IRC identities.
//!
//! Nicknames, account names and channel names are compared through a
//! casefolded form rather than the raw string a client sent. Two names that
//! fold to the same key are the same identity, so `Alice`, `ALICE` and the
//! fullwidth `Ａｌｉｃｅ` all collide.
//!
//! ## Quick Start
//!
//! ```rust
//! use slirc_casefold::{casefold_channel, casefold_identity};
//!
//! assert_eq!(casefold_identity("Alice").unwrap(), "alice");
//! assert_eq!(casefold_channel("#Rust").unwrap(), "#rust");
//! assert!(casefold_identity("#alice").is_err());
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod chan;
mod error;
mod fold;
mod nick;

pub use self::chan::{casefold_channel, CHANNEL_SIGIL};
pub use self::error::CasefoldError;
pub use self::fold::{casefold, casemapping_name, stabilize, MAX_STABILIZE_PASSES};
pub use self::nick::casefold_identity;
