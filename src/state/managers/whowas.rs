//! WHOWAS history.
//!
//! A single fixed-capacity ring of vacated identities, newest at the back.
//! When full, the oldest entry is overwritten. The ring is independent of
//! client and registry lifetime: entries outlive the clients they describe.

use parking_lot::RwLock;
use slirc_casefold::casefold_identity;
use std::collections::VecDeque;

use crate::state::IdentitySnapshot;

/// Snapshot of an identity at the moment its nick was vacated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhowasEntry {
    pub nick_cf: String,
    pub nick: String,
    pub username: String,
    pub hostname: String,
    pub realname: String,
    pub server: String,
    /// When the nick was vacated (Unix millis).
    pub logout_time: i64,
}

impl WhowasEntry {
    pub fn from_snapshot(snapshot: &IdentitySnapshot, server: &str) -> Self {
        Self {
            nick_cf: snapshot.nick_cf.clone(),
            nick: snapshot.nick.clone(),
            username: snapshot.username.clone(),
            hostname: snapshot.hostname.clone(),
            realname: snapshot.realname.clone(),
            server: server.to_string(),
            logout_time: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Bounded WHOWAS ring.
pub struct WhowasList {
    entries: RwLock<VecDeque<WhowasEntry>>,
    capacity: usize,
}

impl WhowasList {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record a vacated identity, evicting the oldest entry when full.
    pub fn append(&self, entry: WhowasEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Entries for `nick`, most recent first, at most `limit` (0 = all).
    pub fn find(&self, nick: &str, limit: usize) -> Vec<WhowasEntry> {
        let Ok(nick_cf) = casefold_identity(nick) else {
            return Vec::new();
        };
        let limit = if limit == 0 { usize::MAX } else { limit };

        self.entries
            .read()
            .iter()
            .rev()
            .filter(|entry| entry.nick_cf == nick_cf)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(nick: &str, realname: &str) -> WhowasEntry {
        WhowasEntry {
            nick_cf: casefold_identity(nick).unwrap(),
            nick: nick.to_string(),
            username: "u".into(),
            hostname: "h".into(),
            realname: realname.into(),
            server: "irc.test".into(),
            logout_time: 0,
        }
    }

    #[test]
    fn find_is_newest_first_and_casefolded() {
        let list = WhowasList::new(10);
        list.append(entry("Alice", "first"));
        list.append(entry("Bob", "bob"));
        list.append(entry("ALICE", "second"));

        let found = list.find("alice", 0);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].realname, "second");
        assert_eq!(found[1].realname, "first");

        assert_eq!(list.find("alice", 1).len(), 1);
        assert!(list.find("carol", 0).is_empty());
        assert!(list.find("#bad", 0).is_empty());
    }

    #[test]
    fn overwrites_oldest() {
        let list = WhowasList::new(2);
        list.append(entry("a", "1"));
        list.append(entry("b", "2"));
        list.append(entry("c", "3"));

        assert_eq!(list.len(), 2);
        assert!(list.find("a", 0).is_empty());
        assert_eq!(list.find("c", 0)[0].realname, "3");
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let list = WhowasList::new(0);
        list.append(entry("a", "1"));
        assert!(list.is_empty());
    }
}
