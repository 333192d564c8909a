//! Client manager for bouncer/multiclient support.
//!
//! The ClientManager handles:
//! - Creating clients for new connections
//! - Session attachment and detachment
//! - Session → client lookup for the transport layer
//!
//! # Thread Safety
//!
//! All maps are DashMaps. Guards are dropped before any client lock is
//! taken, and nothing here awaits.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::MulticlientConfig;
use crate::message::Message;
use crate::state::{Client, ClientId, Session, SessionId};

/// Result of attempting to attach a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachResult {
    /// Attached; the client now has `session_count` sessions.
    Attached {
        session_id: SessionId,
        session_count: usize,
    },
    /// Only logged-in clients may have more than one session.
    NotLoggedIn,
    /// Bouncer support is off, or the account opted out.
    MulticlientNotAllowed,
    /// Too many sessions on this client.
    TooManySessions,
    /// The client lost its last session and is being torn down.
    ClientGone,
}

/// Result of detaching a session.
#[derive(Debug, Clone)]
pub enum DetachResult {
    /// Session removed; others remain.
    Detached { remaining_sessions: usize },
    /// Last session removed; the client is gone from the manager.
    Destroyed(Arc<Client>),
    /// Unknown session.
    NotFound,
}

/// Manages all Client instances.
pub struct ClientManager {
    clients: DashMap<ClientId, Arc<Client>>,
    session_to_client: DashMap<SessionId, ClientId>,
    next_id: AtomicU64,
    history_len: usize,
    policy: MulticlientConfig,
}

impl ClientManager {
    pub fn new(policy: MulticlientConfig, history_len: usize) -> Self {
        Self {
            clients: DashMap::new(),
            session_to_client: DashMap::new(),
            next_id: AtomicU64::new(1),
            history_len,
            policy,
        }
    }

    /// Create a client for a fresh connection.
    ///
    /// The client starts unregistered, with nick `*` and one session.
    pub fn connect(&self, sender: mpsc::Sender<Arc<Message>>, hostname: &str) -> (Arc<Client>, SessionId) {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session = Session::new(sender);
        let session_id = session.id;

        let client = Arc::new(Client::new(id, session, hostname, self.history_len));
        self.clients.insert(id, Arc::clone(&client));
        self.session_to_client.insert(session_id, id);

        debug!(client = %id, session = %session_id, "Client connected");
        (client, session_id)
    }

    /// Attach another session to an existing client.
    pub fn attach_session(
        &self,
        client: &Arc<Client>,
        sender: mpsc::Sender<Arc<Message>>,
    ) -> AttachResult {
        let result = client.attach_session(Session::new(sender), &self.policy);
        if let AttachResult::Attached {
            session_id,
            session_count,
        } = &result
        {
            self.session_to_client.insert(*session_id, client.id());
            info!(
                client = %client.id(),
                session = %session_id,
                sessions = session_count,
                "Session attached"
            );
        }
        result
    }

    /// Detach a session; the client is removed with its last session.
    ///
    /// Callers handle the destroyed client's registry, channel and monitor
    /// cleanup.
    pub fn detach_session(&self, session_id: SessionId) -> DetachResult {
        let Some((_, client_id)) = self.session_to_client.remove(&session_id) else {
            return DetachResult::NotFound;
        };
        let Some(client) = self.get(client_id) else {
            return DetachResult::NotFound;
        };

        match client.detach_session(session_id) {
            None => DetachResult::NotFound,
            Some(0) => {
                self.clients.remove(&client_id);
                debug!(client = %client_id, "Last session detached");
                DetachResult::Destroyed(client)
            }
            Some(remaining_sessions) => {
                debug!(
                    client = %client_id,
                    session = %session_id,
                    remaining = remaining_sessions,
                    "Session detached"
                );
                DetachResult::Detached { remaining_sessions }
            }
        }
    }

    pub fn get(&self, id: ClientId) -> Option<Arc<Client>> {
        self.clients.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn by_session(&self, session_id: SessionId) -> Option<Arc<Client>> {
        let client_id = *self.session_to_client.get(&session_id)?;
        self.get(client_id)
    }

    /// The connected client logged in to `account_cf`, if any.
    pub fn find_by_account(&self, account_cf: &str) -> Option<Arc<Client>> {
        self.all()
            .into_iter()
            .find(|client| client.account_cf().as_deref() == Some(account_cf))
    }

    /// Snapshot of every client.
    pub fn all(&self) -> Vec<Arc<Client>> {
        self.clients.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn session_total(&self) -> usize {
        self.session_to_client.len()
    }
}
