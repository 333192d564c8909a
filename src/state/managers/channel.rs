//! Channel management state.
//!
//! Channels are created on first join and dropped when the last member
//! leaves. Every join and part is recorded in the channel's history.

use dashmap::DashMap;
use slirc_casefold::{CasefoldError, casefold_channel};
use std::sync::Arc;

use crate::history::{HistoryItem, HistoryKind};
use crate::state::{Channel, Client, ClientId};

/// Result of a join.
#[derive(Debug)]
pub struct JoinOutcome {
    pub channel: Arc<Channel>,
    /// `false` if the client was already a member.
    pub joined: bool,
    /// History to replay to the joining session.
    pub replay: Vec<HistoryItem>,
}

/// Channel management state.
pub struct ChannelManager {
    channels: DashMap<String, Arc<Channel>>,
    history_len: usize,
    autoreplay_on_join: usize,
}

impl ChannelManager {
    pub fn new(history_len: usize, autoreplay_on_join: usize) -> Self {
        Self {
            channels: DashMap::new(),
            history_len,
            autoreplay_on_join,
        }
    }

    /// Add `client` to the channel `name`, creating it if needed.
    pub fn join(&self, client: &Arc<Client>, name: &str) -> Result<JoinOutcome, CasefoldError> {
        let name_cf = casefold_channel(name)?;

        // A concurrent part may drop the channel between lookup and insert;
        // retry until the member lands in the live one.
        let (channel, joined) = loop {
            let channel = Arc::clone(
                self.channels
                    .entry(name_cf.clone())
                    .or_insert_with(|| Arc::new(Channel::new(name, &name_cf, self.history_len)))
                    .value(),
            );
            let joined = channel.add_member(client);
            let live = self
                .channels
                .get(&name_cf)
                .is_some_and(|current| Arc::ptr_eq(current.value(), &channel));
            if live {
                break (channel, joined);
            }
            channel.remove_member(client.id());
        };

        if !joined {
            return Ok(JoinOutcome {
                channel,
                joined,
                replay: Vec::new(),
            });
        }

        client.add_channel(&name_cf);
        let replay = channel.history_latest(self.autoreplay_on_join);
        channel.record_history(HistoryItem::new(
            HistoryKind::Join,
            client.mask(),
            client.account(),
            vec![channel.name().to_string()],
        ));

        Ok(JoinOutcome {
            channel,
            joined,
            replay,
        })
    }

    /// Remove `client` from the channel `name`.
    ///
    /// Returns `false` if the client was not a member.
    pub fn part(&self, client: &Arc<Client>, name: &str, reason: Option<&str>) -> Result<bool, CasefoldError> {
        let name_cf = casefold_channel(name)?;
        Ok(self.part_cf(client, &client.mask(), &name_cf, reason))
    }

    fn part_cf(&self, client: &Arc<Client>, origin: &str, name_cf: &str, reason: Option<&str>) -> bool {
        client.remove_channel(name_cf);
        let Some(channel) = self.get_cf(name_cf) else {
            return false;
        };
        if !channel.remove_member(client.id()) {
            return false;
        }

        let mut params = vec![channel.name().to_string()];
        params.extend(reason.map(str::to_string));
        channel.record_history(HistoryItem::new(
            HistoryKind::Part,
            origin,
            client.account(),
            params,
        ));

        self.channels.remove_if(name_cf, |_, ch| ch.is_empty());
        true
    }

    /// Part every channel `client` occupies, attributing the parts to
    /// `origin` (the identity the client had when it left).
    pub fn remove_client(&self, client: &Arc<Client>, origin: &str, reason: Option<&str>) -> usize {
        client
            .channels()
            .iter()
            .filter(|name_cf| self.part_cf(client, origin, name_cf, reason))
            .count()
    }

    /// Append `item` to the channel history; `None` if the channel is gone
    /// or history is disabled.
    pub fn record(&self, name_cf: &str, item: HistoryItem) -> Option<u64> {
        self.get_cf(name_cf)?.record_history(item)
    }

    /// History recorded since `client` joined `name`.
    pub fn replay_since_join(&self, client: ClientId, name: &str) -> Vec<HistoryItem> {
        let Some(channel) = self.get(name) else {
            return Vec::new();
        };
        channel
            .join_time(client)
            .map(|since| channel.history_since(since))
            .unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Channel>> {
        let name_cf = casefold_channel(name).ok()?;
        self.get_cf(&name_cf)
    }

    pub fn get_cf(&self, name_cf: &str) -> Option<Arc<Channel>> {
        self.channels.get(name_cf).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Session;
    use tokio::sync::mpsc;

    fn client(id: u64, nick: &str) -> Arc<Client> {
        let (tx, _rx) = mpsc::channel(1);
        let client = Arc::new(Client::new(ClientId(id), Session::new(tx), "h", 0));
        client.assign_nick(nick.to_string(), nick.to_lowercase());
        client
    }

    #[test]
    fn join_creates_and_records() {
        let mgr = ChannelManager::new(16, 0);
        let alice = client(1, "Alice");

        let outcome = mgr.join(&alice, "#Rust").unwrap();
        assert!(outcome.joined);
        assert_eq!(outcome.channel.name(), "#Rust");
        assert!(alice.is_in_channel("#rust"));

        let history = outcome.channel.history_latest(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, HistoryKind::Join);
        assert_eq!(history[0].origin, "Alice!*@h");

        // Second join is a no-op.
        assert!(!mgr.join(&alice, "#RUST").unwrap().joined);
        assert_eq!(mgr.get("#rust").unwrap().history_latest(10).len(), 1);
    }

    #[test]
    fn invalid_channel_name() {
        let mgr = ChannelManager::new(16, 0);
        let alice = client(1, "Alice");
        assert!(matches!(mgr.join(&alice, "rust"), Err(CasefoldError::InvalidCharacter)));
        assert!(mgr.is_empty());
    }

    #[test]
    fn last_part_drops_channel() {
        let mgr = ChannelManager::new(16, 0);
        let alice = client(1, "Alice");
        let bob = client(2, "Bob");
        mgr.join(&alice, "#a").unwrap();
        mgr.join(&bob, "#a").unwrap();

        assert!(mgr.part(&alice, "#A", Some("bye")).unwrap());
        assert!(!alice.is_in_channel("#a"));
        let channel = mgr.get("#a").unwrap();
        let last = channel.history_latest(1).pop().unwrap();
        assert_eq!(last.kind, HistoryKind::Part);
        assert_eq!(last.params, vec!["#a".to_string(), "bye".to_string()]);

        assert!(!mgr.part(&alice, "#a", None).unwrap());
        assert!(mgr.part(&bob, "#a", None).unwrap());
        assert!(mgr.get("#a").is_none());
    }

    #[test]
    fn autoreplay_on_join() {
        let mgr = ChannelManager::new(16, 5);
        let alice = client(1, "Alice");
        let bob = client(2, "Bob");
        mgr.join(&alice, "#a").unwrap();

        let outcome = mgr.join(&bob, "#a").unwrap();
        assert_eq!(outcome.replay.len(), 1);
        assert_eq!(outcome.replay[0].origin, "Alice!*@h");
    }

    #[test]
    fn replay_since_join_includes_own_join() {
        let mgr = ChannelManager::new(16, 0);
        let alice = client(1, "Alice");
        let bob = client(2, "Bob");
        mgr.join(&alice, "#a").unwrap();
        mgr.join(&bob, "#a").unwrap();

        let items = mgr.replay_since_join(bob.id(), "#a");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].origin, "Bob!*@h");
        assert!(mgr.replay_since_join(ClientId(99), "#a").is_empty());
    }

    #[test]
    fn remove_client_parts_everything() {
        let mgr = ChannelManager::new(16, 0);
        let alice = client(1, "Alice");
        mgr.join(&alice, "#a").unwrap();
        mgr.join(&alice, "#b").unwrap();

        assert_eq!(mgr.remove_client(&alice, "Alice!u@h", Some("Quit")), 2);
        assert!(alice.channels().is_empty());
        assert!(mgr.is_empty());
    }
}
