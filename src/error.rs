//! Unified error handling for the identity layer.
//!
//! Every way a rename can fail is a [`NickError`] variant. The orchestrator
//! matches them exhaustively and turns each one into a single numeric reply
//! addressed to the acting client.

use thiserror::Error;

use crate::message::{Message, Response};

// ============================================================================
// Nick Errors (rename transactions)
// ============================================================================

/// Errors from a nickname change.
///
/// Renaming a client to the nickname it already holds is not an error; the
/// registry reports it as [`NickChange::Unchanged`](crate::state::NickChange).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NickError {
    /// No usable name could be derived.
    #[error("no nickname given")]
    NickMissing,

    /// Failed character-set, length, stabilization or restricted-name checks.
    #[error("erroneous nickname: {0}")]
    NicknameInvalid(String),

    /// The canonical key is bound to a different client.
    #[error("nickname in use: {0}")]
    NicknameInUse(String),

    /// The nickname is reserved by an account the client is not logged in to.
    #[error("nickname reserved by a different account: {0}")]
    AccountMismatch(String),

    /// Every derived name tried during collision recovery was taken.
    #[error("could not find an unused nickname derived from {0}")]
    RenameExhausted(String),
}

impl NickError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NickMissing => "nick_missing",
            Self::NicknameInvalid(_) => "nickname_invalid",
            Self::NicknameInUse(_) => "nickname_in_use",
            Self::AccountMismatch(_) => "account_mismatch",
            Self::RenameExhausted(_) => "rename_exhausted",
        }
    }

    /// Convert to an IRC error reply addressed to `nick`.
    pub fn to_irc_reply(&self, server_name: &str, nick: &str) -> Message {
        let (response, args) = match self {
            Self::NickMissing => (
                Response::ERR_NONICKNAMEGIVEN,
                vec![nick.to_string(), "No nickname given".to_string()],
            ),
            Self::NicknameInvalid(bad_nick) => (
                Response::ERR_ERRONEUSNICKNAME,
                vec![nick.to_string(), bad_nick.clone(), "Erroneous nickname".to_string()],
            ),
            Self::NicknameInUse(bad_nick) => (
                Response::ERR_NICKNAMEINUSE,
                vec![nick.to_string(), bad_nick.clone(), "Nickname is already in use".to_string()],
            ),
            Self::AccountMismatch(bad_nick) => (
                Response::ERR_NICKNAMEINUSE,
                vec![
                    nick.to_string(),
                    bad_nick.clone(),
                    "Nickname is reserved by a different account".to_string(),
                ],
            ),
            Self::RenameExhausted(base) => (
                Response::ERR_UNKNOWNERROR,
                vec![
                    nick.to_string(),
                    "NICK".to_string(),
                    format!("Could not find an unused nickname derived from {base}"),
                ],
            ),
        };

        Message::server_reply(server_name, response, args)
    }
}
