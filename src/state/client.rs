//! Client aggregate for bouncer/multiclient support.
//!
//! A Client is one logical identity: a nickname, an optional account link
//! and a set of channels. It owns one or more attached Sessions (transport
//! connections), all of which observe the same identity.
//!
//! # Architecture
//!
//! ```text
//! Session₁ ─┐
//! Session₂ ─┼→ Client ──member-of──▶ Channel
//! Session₃ ─┘    │
//!                └── nick ◀──maps── NickRegistry
//! ```
//!
//! Mutable fields live behind one `parking_lot::RwLock` at
//! [`LockLevel::Client`]. Accessors copy data out and release the lock
//! before returning, so no guard ever escapes this module.
//!
//! Renames of one client are serialized by an async gate taken before any
//! lock level, so announcements leave in commit order. Once the last
//! session detaches the client is destroyed: it can neither take a nick
//! nor attach a session again.

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::history::{HistoryBuffer, HistoryItem};
use crate::config::MulticlientConfig;
use crate::message::Message;
use crate::state::{AttachResult, Snomask};
use crate::state::lock_order::{Leveled, LockLevel};

/// Unique identifier for a connection/session.
pub type SessionId = Uuid;

/// Placeholder nickname of a client that has not been assigned one yet.
pub const NO_NICK: &str = "*";

/// Server-local client identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// One attached transport connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub sender: mpsc::Sender<Arc<Message>>,
    pub attached_at: DateTime<Utc>,
}

impl Session {
    pub fn new(sender: mpsc::Sender<Arc<Message>>) -> Self {
        Self {
            id: SessionId::new_v4(),
            sender,
            attached_at: Utc::now(),
        }
    }

    /// Queue `msg` for this session, waiting on backpressure.
    ///
    /// A closed session is not an error here: it is detaching concurrently
    /// and simply misses the message.
    pub async fn send(&self, msg: Arc<Message>) -> bool {
        if self.sender.send(msg).await.is_err() {
            warn!(session = %self.id, "Dropped message for closed session");
            return false;
        }
        true
    }
}

/// Point-in-time copy of a client's visible identity.
///
/// Taken before a rename so notices, WHOWAS and history can describe the
/// identity being vacated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySnapshot {
    pub nick: String,
    pub nick_cf: String,
    pub username: String,
    pub hostname: String,
    pub realname: String,
    pub account: Option<String>,
}

impl IdentitySnapshot {
    /// Whether the client held a real nickname at snapshot time.
    pub fn has_nick(&self) -> bool {
        !self.nick_cf.is_empty()
    }

    /// `nick!user@host`
    pub fn mask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.username, self.hostname)
    }
}

#[derive(Debug)]
struct ClientState {
    nick: String,
    nick_cf: String,
    /// Nick requested during registration, kept as the base for forced
    /// renames while the client still has no nick.
    prereg_nick: String,
    username: String,
    hostname: String,
    realname: String,
    account: Option<String>,
    account_cf: Option<String>,
    /// Per-account multiclient opt-in/out.
    multiclient: Option<bool>,
    sessions: Vec<Session>,
    channels: HashSet<String>,
    registered: bool,
    /// Set with the removal of the last session; never cleared.
    destroyed: bool,
    oper: Option<String>,
    snomasks: HashSet<Snomask>,
    history: HistoryBuffer,
}

impl ClientState {
    fn identity(&self) -> IdentitySnapshot {
        IdentitySnapshot {
            nick: self.nick.clone(),
            nick_cf: self.nick_cf.clone(),
            username: self.username.clone(),
            hostname: self.hostname.clone(),
            realname: self.realname.clone(),
            account: self.account.clone(),
        }
    }
}

/// A logical end-user identity.
#[derive(Debug)]
pub struct Client {
    id: ClientId,
    created_at: DateTime<Utc>,
    state: RwLock<ClientState>,
    rename_gate: tokio::sync::Mutex<()>,
}

impl Client {
    /// Create an unregistered client with one session and no nickname.
    pub fn new(id: ClientId, session: Session, hostname: &str, history_len: usize) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            state: RwLock::new(ClientState {
                nick: NO_NICK.to_string(),
                nick_cf: String::new(),
                prereg_nick: String::new(),
                username: NO_NICK.to_string(),
                hostname: hostname.to_string(),
                realname: String::new(),
                account: None,
                account_cf: None,
                multiclient: None,
                sessions: vec![session],
                channels: HashSet::new(),
                registered: false,
                destroyed: false,
                oper: None,
                snomasks: HashSet::new(),
                history: HistoryBuffer::new(history_len),
            }),
            rename_gate: tokio::sync::Mutex::new(()),
        }
    }

    fn read(&self) -> Leveled<RwLockReadGuard<'_, ClientState>> {
        Leveled::acquire(LockLevel::Client, || self.state.read())
    }

    fn write(&self) -> Leveled<RwLockWriteGuard<'_, ClientState>> {
        Leveled::acquire(LockLevel::Client, || self.state.write())
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // === Identity ===

    /// Display nickname, `*` before one is assigned.
    pub fn nick(&self) -> String {
        self.read().nick.clone()
    }

    /// Canonical key of the current nickname, empty before one is assigned.
    pub fn nick_cf(&self) -> String {
        self.read().nick_cf.clone()
    }

    pub fn has_nick(&self) -> bool {
        !self.read().nick_cf.is_empty()
    }

    pub fn snapshot(&self) -> IdentitySnapshot {
        self.read().identity()
    }

    /// `nick!user@host`
    pub fn mask(&self) -> String {
        self.snapshot().mask()
    }

    /// Install a new nickname, returning the identity it replaces.
    ///
    /// Only the registry calls this, from inside its transaction. A
    /// destroyed client is left untouched and yields `None`.
    pub(crate) fn assign_nick(&self, nick: String, nick_cf: String) -> Option<IdentitySnapshot> {
        let mut state = self.write();
        if state.destroyed {
            return None;
        }
        let previous = state.identity();
        state.nick = nick;
        state.nick_cf = nick_cf;
        Some(previous)
    }

    /// Wait for any in-flight rename of this client to finish announcing.
    pub(crate) async fn lock_renames(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.rename_gate.lock().await
    }

    /// Drop the nickname after the registry released it.
    pub(crate) fn clear_nick(&self) {
        let mut state = self.write();
        state.nick = NO_NICK.to_string();
        state.nick_cf.clear();
    }

    pub fn prereg_nick(&self) -> String {
        self.read().prereg_nick.clone()
    }

    pub fn set_prereg_nick(&self, nick: &str) {
        self.write().prereg_nick = nick.to_string();
    }

    /// Set the USER fields.
    pub fn set_user(&self, username: &str, realname: &str) {
        let mut state = self.write();
        state.username = username.to_string();
        state.realname = realname.to_string();
    }

    pub fn is_registered(&self) -> bool {
        self.read().registered
    }

    /// Whether the last session has detached.
    pub fn is_destroyed(&self) -> bool {
        self.read().destroyed
    }

    pub(crate) fn set_registered(&self) -> bool {
        let mut state = self.write();
        !std::mem::replace(&mut state.registered, true)
    }

    // === Account ===

    pub fn account(&self) -> Option<String> {
        self.read().account.clone()
    }

    pub fn account_cf(&self) -> Option<String> {
        self.read().account_cf.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().account_cf.is_some()
    }

    pub(crate) fn set_account(&self, account: String, account_cf: String) {
        let mut state = self.write();
        state.account = Some(account);
        state.account_cf = Some(account_cf);
    }

    /// Clear the account link, returning the account that was linked.
    pub(crate) fn clear_account(&self) -> Option<String> {
        let mut state = self.write();
        state.account_cf = None;
        state.account.take()
    }

    pub fn multiclient_setting(&self) -> Option<bool> {
        self.read().multiclient
    }

    pub fn set_multiclient_setting(&self, setting: Option<bool>) {
        self.write().multiclient = setting;
    }

    // === Sessions ===

    /// Copy of the attached sessions.
    pub fn sessions(&self) -> Vec<Session> {
        self.read().sessions.clone()
    }

    pub fn session(&self, id: SessionId) -> Option<Session> {
        self.read().sessions.iter().find(|s| s.id == id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_connected(&self) -> bool {
        !self.read().sessions.is_empty()
    }

    /// Attach `session` if `policy` and the client's state allow it.
    ///
    /// Every check and the push happen under one write lock, so concurrent
    /// attaches cannot overshoot the cap or revive a destroyed client.
    pub(crate) fn attach_session(&self, session: Session, policy: &MulticlientConfig) -> AttachResult {
        let mut state = self.write();
        if state.destroyed {
            return AttachResult::ClientGone;
        }
        if state.account_cf.is_none() {
            return AttachResult::NotLoggedIn;
        }
        if !policy.is_multiclient_enabled(state.multiclient) {
            return AttachResult::MulticlientNotAllowed;
        }
        if state.sessions.len() >= policy.max_sessions_per_client {
            return AttachResult::TooManySessions;
        }

        let session_id = session.id;
        state.sessions.push(session);
        AttachResult::Attached {
            session_id,
            session_count: state.sessions.len(),
        }
    }

    /// Detach `id`, returning the remaining session count, or `None` if it
    /// was not attached. Removing the last session destroys the client.
    pub(crate) fn detach_session(&self, id: SessionId) -> Option<usize> {
        let mut state = self.write();
        let index = state.sessions.iter().position(|s| s.id == id)?;
        state.sessions.remove(index);
        if state.sessions.is_empty() {
            state.destroyed = true;
        }
        Some(state.sessions.len())
    }

    // === Channels ===

    /// Canonical names of the channels this client occupies.
    pub fn channels(&self) -> Vec<String> {
        self.read().channels.iter().cloned().collect()
    }

    pub fn is_in_channel(&self, channel_cf: &str) -> bool {
        self.read().channels.contains(channel_cf)
    }

    pub(crate) fn add_channel(&self, channel_cf: &str) -> bool {
        self.write().channels.insert(channel_cf.to_string())
    }

    pub(crate) fn remove_channel(&self, channel_cf: &str) -> bool {
        self.write().channels.remove(channel_cf)
    }

    // === Operator ===

    /// Mark the client as an operator subscribed to `snomasks`.
    pub fn set_oper(&self, oper_name: &str, snomasks: &[Snomask]) {
        let mut state = self.write();
        state.oper = Some(oper_name.to_string());
        state.snomasks = snomasks.iter().copied().collect();
    }

    pub fn is_oper(&self) -> bool {
        self.read().oper.is_some()
    }

    pub fn has_snomask(&self, mask: Snomask) -> bool {
        let state = self.read();
        state.oper.is_some() && state.snomasks.contains(&mask)
    }

    // === History ===

    pub(crate) fn record_history(&self, item: HistoryItem) -> Option<u64> {
        self.write().history.push(item)
    }

    /// The newest `limit` items of this client's own history.
    pub fn history_latest(&self, limit: usize) -> Vec<HistoryItem> {
        self.read().history.latest(limit)
    }
}
