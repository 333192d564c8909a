//! NICK handling and the rename orchestrator.
//!
//! Every rename, whether a user command, collision recovery or policy
//! enforcement, goes through [`perform_nick_change`]: registry transaction,
//! then notifications and history outside every lock. Renames of one client
//! hold its rename gate until announced, so friends see them in commit
//! order.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::ResponseBuffer;
use super::rename::force_nick;
use crate::error::NickError;
use crate::history::{HistoryItem, HistoryKind};
use crate::message::Message;
use crate::metrics;
use crate::state::{Client, IdentitySnapshot, Matrix, NickChange, SessionId, Snomask};

/// One rename attempt.
#[derive(Debug, Clone, Copy)]
pub struct NickChangeRequest<'a> {
    /// Who asked; an operator may rename someone else.
    pub actor: &'a Arc<Client>,
    pub target: &'a Arc<Client>,
    /// Session that issued the request; it gets its NICK line through the
    /// response buffer instead of the fan-out.
    pub session: Option<SessionId>,
    pub nick: &'a str,
}

/// Rename `req.target` and tell everyone who needs to know.
///
/// Errors are also pushed onto `rb` as the matching numeric reply addressed
/// to the actor. `Unchanged` produces no notification and no history.
pub async fn perform_nick_change(
    matrix: &Matrix,
    req: NickChangeRequest<'_>,
    rb: &mut ResponseBuffer,
) -> Result<NickChange, NickError> {
    let _gate = req.target.lock_renames().await;

    let change = match matrix.nicks.set_nick(req.target, req.nick) {
        Ok(change) => change,
        Err(e) => {
            metrics::record_nick_change(e.error_code());
            rb.add(e.to_irc_reply(matrix.server_name(), &req.actor.nick()));
            return Err(e);
        }
    };

    let NickChange::Changed {
        nick,
        nick_cf,
        previous,
        needs_enforcement,
    } = &change
    else {
        metrics::record_nick_change("unchanged");
        return Ok(change);
    };

    matrix.touch_nick_timer(req.target.id(), *needs_enforcement);
    debug!(old = %previous.mask(), new = %nick, casefolded = %nick_cf, "Nick changed");

    // A client without a prior nick is still registering; the welcome
    // sequence announces it instead.
    if previous.has_nick() {
        announce_rename(matrix, &req, previous, nick, rb).await;
    }

    if req.target.is_registered() {
        let after = IdentitySnapshot {
            nick: nick.clone(),
            nick_cf: nick_cf.clone(),
            ..previous.clone()
        };
        matrix
            .monitors
            .alert_about(matrix.server_name(), Some(previous), Some(&after))
            .await;
    }

    metrics::record_nick_change("changed");
    Ok(change)
}

async fn announce_rename(
    matrix: &Matrix,
    req: &NickChangeRequest<'_>,
    before: &IdentitySnapshot,
    nick: &str,
    rb: &mut ResponseBuffer,
) {
    let notice = if req.actor.id() == req.target.id() {
        format!("{} changed nickname to {}", before.nick, nick)
    } else {
        format!(
            "Operator {} changed nickname of {} to {}",
            req.actor.nick(),
            before.nick,
            nick
        )
    };
    matrix.send_snomask(Snomask::LocalNicks, &notice).await;

    matrix.record_whowas(before);

    let line = Message::nick(&before.mask(), nick);
    let channels = req.target.channels();

    let mut recipients = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |client: &Arc<Client>| {
        for session in client.sessions() {
            if seen.insert(session.id) {
                recipients.push(session);
            }
        }
    };
    push(req.target);
    for name_cf in &channels {
        if let Some(channel) = matrix.channels.get_cf(name_cf) {
            for member in channel.members() {
                push(&member.client);
            }
        }
    }

    let shared = Arc::new(line.clone());
    for session in recipients {
        if Some(session.id) == req.session {
            rb.add(line.clone());
        } else {
            session.send(Arc::clone(&shared)).await;
        }
    }

    let item = HistoryItem::new(
        HistoryKind::Nick,
        before.mask(),
        before.account.clone(),
        vec![nick.to_string()],
    );
    for name_cf in &channels {
        matrix.channels.record(name_cf, item.clone());
    }
    req.target.record_history(item);
}

/// NICK command entry point.
///
/// A client that is still registering and collides with another holder is
/// given a derived nick instead of being left without one.
pub async fn handle_nick(
    matrix: &Matrix,
    client: &Arc<Client>,
    session: SessionId,
    nick: &str,
) -> Result<NickChange, NickError> {
    if !client.is_registered() {
        client.set_prereg_nick(nick.trim());
    }

    let mut rb = ResponseBuffer::new(Some(session));
    let result = perform_nick_change(
        matrix,
        NickChangeRequest {
            actor: client,
            target: client,
            session: Some(session),
            nick,
        },
        &mut rb,
    )
    .await;
    rb.send(client).await;

    match result {
        Err(NickError::NicknameInUse(_) | NickError::AccountMismatch(_)) if !client.has_nick() => {
            force_nick(matrix, client, Some(session)).await
        }
        other => other,
    }
}
