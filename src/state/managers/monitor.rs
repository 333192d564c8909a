//! Monitor management state.
//!
//! This module contains the `MonitorManager` struct, which isolates all
//! MONITOR-related state from the main Matrix struct.

use dashmap::{DashMap, DashSet};
use slirc_casefold::casefold_identity;
use std::sync::Arc;
use thiserror::Error;

use crate::message::{Message, Response};
use crate::state::{Client, ClientId, IdentitySnapshot};

/// MONITOR list errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("invalid monitor target: {0}")]
    InvalidTarget(String),
    #[error("monitor list is full ({0} entries)")]
    ListFull(usize),
}

impl MonitorError {
    /// Convert to an IRC error reply addressed to `nick`, if one exists.
    pub fn to_irc_reply(&self, server_name: &str, nick: &str) -> Option<Message> {
        match self {
            Self::ListFull(limit) => Some(Message::server_reply(
                server_name,
                Response::ERR_MONLISTFULL,
                vec![nick.to_string(), limit.to_string(), "Monitor list is full".to_string()],
            )),
            // Invalid targets are silently skipped.
            Self::InvalidTarget(_) => None,
        }
    }
}

/// Monitor management state.
///
/// - Forward mapping: client to monitored canonical nicknames
/// - Reverse mapping: canonical nickname to the clients monitoring it
pub struct MonitorManager {
    monitors: DashMap<ClientId, DashSet<String>>,
    monitoring: DashMap<String, DashMap<ClientId, Arc<Client>>>,
    limit: usize,
}

impl MonitorManager {
    /// Create a new MonitorManager allowing `limit` targets per client.
    pub fn new(limit: usize) -> Self {
        Self {
            monitors: DashMap::new(),
            monitoring: DashMap::new(),
            limit,
        }
    }

    /// Start watching `target`, returning its canonical key.
    pub fn add(&self, watcher: &Arc<Client>, target: &str) -> Result<String, MonitorError> {
        let nick_cf =
            casefold_identity(target).map_err(|_| MonitorError::InvalidTarget(target.to_string()))?;

        {
            let targets = self.monitors.entry(watcher.id()).or_default();
            if !targets.contains(&nick_cf) && targets.len() >= self.limit {
                return Err(MonitorError::ListFull(self.limit));
            }
            targets.insert(nick_cf.clone());
        }

        self.monitoring
            .entry(nick_cf.clone())
            .or_default()
            .insert(watcher.id(), Arc::clone(watcher));
        Ok(nick_cf)
    }

    /// Stop watching `target`.
    pub fn remove(&self, watcher: ClientId, target: &str) -> bool {
        let Ok(nick_cf) = casefold_identity(target) else {
            return false;
        };
        let removed = self
            .monitors
            .get(&watcher)
            .is_some_and(|targets| targets.remove(&nick_cf).is_some());
        if removed {
            self.unlink(&nick_cf, watcher);
        }
        removed
    }

    /// Drop every subscription held by `watcher`.
    pub fn clear(&self, watcher: ClientId) {
        if let Some((_, targets)) = self.monitors.remove(&watcher) {
            for nick_cf in targets {
                self.unlink(&nick_cf, watcher);
            }
        }
    }

    fn unlink(&self, nick_cf: &str, watcher: ClientId) {
        if let Some(watchers) = self.monitoring.get(nick_cf) {
            watchers.remove(&watcher);
        }
        self.monitoring.remove_if(nick_cf, |_, watchers| watchers.is_empty());
    }

    /// Canonical keys `watcher` is monitoring.
    pub fn targets(&self, watcher: ClientId) -> Vec<String> {
        self.monitors
            .get(&watcher)
            .map(|targets| targets.iter().map(|t| t.key().clone()).collect())
            .unwrap_or_default()
    }

    /// Clients monitoring `nick_cf`.
    pub fn watchers_of(&self, nick_cf: &str) -> Vec<Arc<Client>> {
        self.monitoring
            .get(nick_cf)
            .map(|watchers| watchers.iter().map(|w| Arc::clone(w.value())).collect())
            .unwrap_or_default()
    }

    /// Tell watchers that `old` went offline and `new` came online.
    ///
    /// Watchers are snapshotted first; sends happen with no map guard held.
    pub async fn alert_about(
        &self,
        server_name: &str,
        old: Option<&IdentitySnapshot>,
        new: Option<&IdentitySnapshot>,
    ) {
        if let Some(old) = old.filter(|s| s.has_nick()) {
            for watcher in self.watchers_of(&old.nick_cf) {
                notify(server_name, &watcher, Response::RPL_MONOFFLINE, old.nick.clone()).await;
            }
        }
        if let Some(new) = new.filter(|s| s.has_nick()) {
            for watcher in self.watchers_of(&new.nick_cf) {
                notify(server_name, &watcher, Response::RPL_MONONLINE, new.mask()).await;
            }
        }
    }
}

async fn notify(server_name: &str, watcher: &Client, response: Response, target: String) {
    let msg = Arc::new(Message::server_reply(
        server_name,
        response,
        vec![watcher.nick(), target],
    ));
    for session in watcher.sessions() {
        session.send(Arc::clone(&msg)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Session;
    use tokio::sync::mpsc;

    fn client(id: u64) -> (Arc<Client>, mpsc::Receiver<Arc<Message>>) {
        let (tx, rx) = mpsc::channel(8);
        let client = Arc::new(Client::new(ClientId(id), Session::new(tx), "h", 0));
        (client, rx)
    }

    #[test]
    fn add_and_remove() {
        let monitors = MonitorManager::new(10);
        let (w, _rx) = client(1);

        assert_eq!(monitors.add(&w, "Alice").unwrap(), "alice");
        assert_eq!(monitors.watchers_of("alice").len(), 1);
        assert_eq!(monitors.targets(w.id()), vec!["alice".to_string()]);

        assert!(monitors.remove(w.id(), "ALICE"));
        assert!(monitors.watchers_of("alice").is_empty());
        assert!(!monitors.remove(w.id(), "alice"));
    }

    #[test]
    fn list_limit() {
        let monitors = MonitorManager::new(1);
        let (w, _rx) = client(1);
        monitors.add(&w, "a").unwrap();
        // Re-adding an existing target does not count against the limit.
        monitors.add(&w, "A").unwrap();
        assert_eq!(monitors.add(&w, "b"), Err(MonitorError::ListFull(1)));
        assert!(monitors.add(&w, "#x").is_err());
    }

    #[test]
    fn clear_drops_reverse_links() {
        let monitors = MonitorManager::new(10);
        let (w, _rx) = client(1);
        monitors.add(&w, "a").unwrap();
        monitors.add(&w, "b").unwrap();
        monitors.clear(w.id());
        assert!(monitors.watchers_of("a").is_empty());
        assert!(monitors.targets(w.id()).is_empty());
    }

    #[tokio::test]
    async fn alert_sends_offline_then_online() {
        let monitors = MonitorManager::new(10);
        let (w, mut rx) = client(1);
        w.assign_nick("Watcher".into(), "watcher".into());
        monitors.add(&w, "old").unwrap();
        monitors.add(&w, "new").unwrap();

        let old = IdentitySnapshot {
            nick: "Old".into(),
            nick_cf: "old".into(),
            username: "u".into(),
            hostname: "h".into(),
            realname: String::new(),
            account: None,
        };
        let new = IdentitySnapshot {
            nick: "New".into(),
            nick_cf: "new".into(),
            ..old.clone()
        };
        monitors.alert_about("irc.test", Some(&old), Some(&new)).await;

        assert_eq!(rx.recv().await.unwrap().to_string(), ":irc.test 731 Watcher :Old");
        assert_eq!(rx.recv().await.unwrap().to_string(), ":irc.test 730 Watcher :New!u@h");
        assert!(rx.try_recv().is_err());
    }
}
