//! Identity command handlers.
//!
//! Handlers drive the rename orchestration on behalf of a client. Replies
//! meant for the session that issued a request are collected in a
//! [`ResponseBuffer`] and delivered once the handler is done; everything
//! else goes straight to the affected sessions.

pub mod account;
pub mod nick;
pub mod rename;

pub use account::{login, logout};
pub use nick::{NickChangeRequest, handle_nick, perform_nick_change};
pub use rename::{
    MAX_FORCE_NICK_ATTEMPTS, derive_nick, force_nick, force_nick_with, randomly_rename,
    randomly_rename_with,
};

use std::sync::Arc;

use crate::message::Message;
use crate::state::{Client, SessionId};

/// Replies addressed to the session that issued a request.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    session: Option<SessionId>,
    messages: Vec<Message>,
}

impl ResponseBuffer {
    /// Buffer for `session`; `None` means any one session of the client.
    pub fn new(session: Option<SessionId>) -> Self {
        Self {
            session,
            messages: Vec::new(),
        }
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn add(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Deliver the buffered replies to exactly one session of `client`.
    ///
    /// Falls back to the first attached session if the addressed one is
    /// gone. Returns the number of messages queued.
    pub async fn send(self, client: &Client) -> usize {
        if self.messages.is_empty() {
            return 0;
        }
        let session = self
            .session
            .and_then(|id| client.session(id))
            .or_else(|| client.sessions().into_iter().next());
        let Some(session) = session else {
            return 0;
        };

        let mut sent = 0;
        for msg in self.messages {
            if session.send(Arc::new(msg)).await {
                sent += 1;
            }
        }
        sent
    }
}
