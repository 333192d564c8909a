//! Channel entity: members and history.
//!
//! Member set and history share one `parking_lot::Mutex` at
//! [`LockLevel::Channel`], so history appends are totally ordered within a
//! channel.

use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;

use crate::history::{HistoryBuffer, HistoryItem, now_nanos};
use crate::state::client::{Client, ClientId};
use crate::state::lock_order::{Leveled, LockLevel};

/// One channel member.
#[derive(Debug, Clone)]
pub struct Member {
    pub client: Arc<Client>,
    /// Join time in nanoseconds since the epoch.
    pub join_time: i64,
}

#[derive(Debug)]
struct ChannelState {
    members: HashMap<ClientId, Member>,
    history: HistoryBuffer,
}

/// A named room.
#[derive(Debug)]
pub struct Channel {
    name: String,
    name_cf: String,
    state: Mutex<ChannelState>,
}

impl Channel {
    pub fn new(name: &str, name_cf: &str, history_len: usize) -> Self {
        Self {
            name: name.to_string(),
            name_cf: name_cf.to_string(),
            state: Mutex::new(ChannelState {
                members: HashMap::new(),
                history: HistoryBuffer::new(history_len),
            }),
        }
    }

    fn lock(&self) -> Leveled<MutexGuard<'_, ChannelState>> {
        Leveled::acquire(LockLevel::Channel, || self.state.lock())
    }

    /// Name as first created.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_cf(&self) -> &str {
        &self.name_cf
    }

    /// Add `client`; returns `false` if it was already a member.
    pub(crate) fn add_member(&self, client: &Arc<Client>) -> bool {
        let mut state = self.lock();
        if state.members.contains_key(&client.id()) {
            return false;
        }
        state.members.insert(
            client.id(),
            Member {
                client: Arc::clone(client),
                join_time: now_nanos(),
            },
        );
        true
    }

    pub(crate) fn remove_member(&self, id: ClientId) -> bool {
        self.lock().members.remove(&id).is_some()
    }

    pub fn is_member(&self, id: ClientId) -> bool {
        self.lock().members.contains_key(&id)
    }

    /// Copy of the member list.
    pub fn members(&self) -> Vec<Member> {
        self.lock().members.values().cloned().collect()
    }

    pub fn member_count(&self) -> usize {
        self.lock().members.len()
    }

    pub fn join_time(&self, id: ClientId) -> Option<i64> {
        self.lock().members.get(&id).map(|m| m.join_time)
    }

    pub(crate) fn record_history(&self, item: HistoryItem) -> Option<u64> {
        self.lock().history.push(item)
    }

    /// The newest `limit` history items.
    pub fn history_latest(&self, limit: usize) -> Vec<HistoryItem> {
        self.lock().history.latest(limit)
    }

    /// History items since `nanotime`, inclusive.
    pub fn history_since(&self, nanotime: i64) -> Vec<HistoryItem> {
        self.lock().history.since(nanotime)
    }

    /// Whether the channel has no members.
    pub fn is_empty(&self) -> bool {
        self.lock().members.is_empty()
    }
}
