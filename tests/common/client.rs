//! Test client: one logical client and the receiving end of each session.

use slircd_identity::message::Message;
use slircd_identity::state::{Client, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct TestClient {
    pub client: Arc<Client>,
    pub sessions: Vec<(SessionId, mpsc::Receiver<Arc<Message>>)>,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(client: Arc<Client>, session: SessionId, rx: mpsc::Receiver<Arc<Message>>) -> Self {
        Self {
            client,
            sessions: vec![(session, rx)],
        }
    }

    /// Track another session, returning its index.
    pub fn add_session(&mut self, session: SessionId, rx: mpsc::Receiver<Arc<Message>>) -> usize {
        self.sessions.push((session, rx));
        self.sessions.len() - 1
    }

    /// Id of the session at `index`.
    pub fn session(&self, index: usize) -> SessionId {
        self.sessions[index].0
    }

    /// Everything queued for the session at `index`, as wire lines.
    pub fn take(&mut self, index: usize) -> Vec<String> {
        let rx = &mut self.sessions[index].1;
        let mut lines = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            lines.push(msg.to_string());
        }
        lines
    }

    /// Discard everything queued on every session.
    pub fn drain(&mut self) {
        for (_, rx) in &mut self.sessions {
            while rx.try_recv().is_ok() {}
        }
    }
}
