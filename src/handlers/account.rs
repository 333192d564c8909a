//! Account login/logout as seen by the identity layer.
//!
//! Credentials are verified elsewhere; these entry points run after the
//! fact and keep the nick consistent with the account link.

use slirc_casefold::casefold_identity;
use std::sync::Arc;
use tracing::info;

use super::ResponseBuffer;
use super::nick::{NickChangeRequest, perform_nick_change};
use crate::error::NickError;
use crate::message::{Message, Response};
use crate::state::{Client, Matrix, SessionId};

/// Link `client` to `account` after a successful authentication.
///
/// When nicks must equal account names, the client is renamed to its
/// account. If that fails the login is undone: holding a unique nick wins
/// over being logged in.
pub async fn login(
    matrix: &Matrix,
    client: &Arc<Client>,
    session: Option<SessionId>,
    account: &str,
) -> Result<(), NickError> {
    let Ok(account_cf) = casefold_identity(account) else {
        return Err(NickError::NicknameInvalid(account.to_string()));
    };

    client.set_account(account.to_string(), account_cf.clone());
    if !matrix
        .nicks
        .reserved_for_other(&client.nick_cf(), Some(&account_cf))
    {
        matrix.enforce_timers.remove(&client.id());
    }
    info!(client = %client.id(), account = %account, "Client logged in");

    if !matrix.nicks.policy().force_nick_equals_account {
        return Ok(());
    }

    let mut rb = ResponseBuffer::new(session);
    let result = perform_nick_change(
        matrix,
        NickChangeRequest {
            actor: client,
            target: client,
            session,
            nick: "",
        },
        &mut rb,
    )
    .await;

    if let Err(e) = &result {
        client.clear_account();
        let nick = client.nick();
        rb.add(Message::server_notice(
            matrix.server_name(),
            nick.clone(),
            "Your account is already in use elsewhere",
        ));
        rb.add(Message::server_reply(
            matrix.server_name(),
            Response::ERR_NICKLOCKED,
            vec![nick, "You must use a nick assigned to you".to_string()],
        ));
        info!(client = %client.id(), account = %account, error = %e, "Logged out: account nick unavailable");
    }
    rb.send(client).await;
    result.map(|_| ())
}

/// Unlink `client` from its account, returning the account it had.
///
/// A nick reserved by that account arms the rename timer again.
pub fn logout(matrix: &Matrix, client: &Arc<Client>) -> Option<String> {
    let account = client.clear_account()?;
    let delinquent = matrix.nicks.reserved_for_other(&client.nick_cf(), None);
    if delinquent {
        matrix.touch_nick_timer(client.id(), true);
    }
    info!(client = %client.id(), account = %account, "Client logged out");
    Some(account)
}
