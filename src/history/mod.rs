//! In-memory identity history.
//!
//! Channels and clients each own a [`HistoryBuffer`]. Items are appended
//! under the owner's lock and never modified afterwards.

mod buffer;
mod types;

pub use buffer::HistoryBuffer;
pub use types::{HistoryItem, HistoryKind};

pub(crate) use types::now_nanos;
