//! Type definitions for identity history.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Kind of recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryKind {
    Nick,
    Join,
    Part,
}

impl HistoryKind {
    /// The protocol command that replays this item.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Nick => "NICK",
            Self::Join => "JOIN",
            Self::Part => "PART",
        }
    }
}

/// One immutable history record.
///
/// `seq` and a monotonic `nanotime` are assigned when the item is pushed
/// into a [`HistoryBuffer`](super::HistoryBuffer); ordering within a buffer
/// is by `(nanotime, seq)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub msgid: String,
    pub kind: HistoryKind,
    pub nanotime: i64,
    pub seq: u64,
    /// `nick!user@host` of the client the event is about, before the event.
    pub origin: String,
    pub account: Option<String>,
    pub params: Vec<String>,
}

impl HistoryItem {
    /// Create an item stamped with the current time.
    pub fn new(
        kind: HistoryKind,
        origin: impl Into<String>,
        account: Option<String>,
        params: Vec<String>,
    ) -> Self {
        Self {
            msgid: Uuid::new_v4().simple().to_string(),
            kind,
            nanotime: now_nanos(),
            seq: 0,
            origin: origin.into(),
            account,
            params,
        }
    }

    /// Convert nanotime to ISO8601 timestamp for IRCv3 server-time tag.
    pub fn timestamp_iso(&self) -> String {
        let secs = self.nanotime.div_euclid(1_000_000_000);
        let nanos = self.nanotime.rem_euclid(1_000_000_000) as u32;

        if let Some(dt) = DateTime::<Utc>::from_timestamp(secs, nanos) {
            dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        } else {
            "1970-01-01T00:00:00.000Z".to_string()
        }
    }
}

/// Current wall-clock time in nanoseconds since the epoch.
pub(crate) fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_has_fresh_msgid() {
        let a = HistoryItem::new(HistoryKind::Nick, "a!u@h", None, vec!["b".into()]);
        let b = HistoryItem::new(HistoryKind::Nick, "a!u@h", None, vec!["b".into()]);
        assert_ne!(a.msgid, b.msgid);
        assert_eq!(a.msgid.len(), 32);
        assert_eq!(a.seq, 0);
    }

    #[test]
    fn timestamp_iso_formats_millis() {
        let mut item = HistoryItem::new(HistoryKind::Join, "a!u@h", None, Vec::new());
        item.nanotime = 1_700_000_000_123_456_789;
        assert_eq!(item.timestamp_iso(), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn kind_commands() {
        assert_eq!(HistoryKind::Nick.command(), "NICK");
        assert_eq!(HistoryKind::Part.command(), "PART");
    }
}
