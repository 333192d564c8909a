//! Server-initiated renames.
//!
//! - [`randomly_rename`] gives a client an arbitrary guest nick built from
//!   the configured template and a random token.
//! - [`force_nick`] recovers from a collision by trying a few names derived
//!   from the one the client wanted.
//!
//! Both run through the regular orchestrator, so uniqueness, notification
//! and history behave exactly as for a user-issued NICK.

use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::ResponseBuffer;
use super::nick::{NickChangeRequest, perform_nick_change};
use crate::error::NickError;
use crate::metrics;
use crate::state::{Client, Matrix, NickChange, SessionId};

/// Derived names tried before collision recovery gives up.
pub const MAX_FORCE_NICK_ATTEMPTS: usize = 3;

/// Hex digits appended to a derived nick.
const SUFFIX_LEN: usize = 8;

/// Random bytes in a guest token.
const TOKEN_BYTES: usize = 8;

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Lowercase RFC 4648 base32 without padding.
fn base32_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn random_token<R: RngCore>(rng: &mut R) -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill_bytes(&mut bytes);
    base32_lower(&bytes)
}

/// `<base>-<8 hex digits>`, with `base` cut so the result fits `nicklen`.
pub fn derive_nick<R: RngCore>(base: &str, nicklen: usize, rng: &mut R) -> String {
    let keep = nicklen.saturating_sub(SUFFIX_LEN + 1);
    let base: String = base.chars().take(keep).collect();
    format!("{base}-{:08x}", rng.next_u32())
}

/// Rename `client` to a fresh guest nick.
pub async fn randomly_rename(matrix: &Matrix, client: &Arc<Client>) -> Result<NickChange, NickError> {
    let mut rng = OsRng;
    randomly_rename_with(matrix, client, &mut rng).await
}

/// [`randomly_rename`] with a caller-supplied random source.
///
/// Any error reply goes to a single session of the client.
pub async fn randomly_rename_with<R: RngCore + Send>(
    matrix: &Matrix,
    client: &Arc<Client>,
    rng: &mut R,
) -> Result<NickChange, NickError> {
    let token = random_token(rng);
    let nick = matrix
        .config
        .accounts
        .nick_reservation
        .guest_nick(&token);
    let old_nick = client.nick();

    let session = client.sessions().first().map(|s| s.id);
    let mut rb = ResponseBuffer::new(session);
    let result = perform_nick_change(
        matrix,
        NickChangeRequest {
            actor: client,
            target: client,
            session,
            nick: &nick,
        },
        &mut rb,
    )
    .await;
    rb.send(client).await;

    if let Ok(NickChange::Changed { .. }) = &result {
        metrics::record_forced_rename("random");
        info!(client = %client.id(), old_nick = %old_nick, new_nick = %nick, "Client randomly renamed");
    }
    result
}

/// Recover from a collision by trying names derived from the client's nick.
pub async fn force_nick(
    matrix: &Matrix,
    client: &Arc<Client>,
    session: Option<SessionId>,
) -> Result<NickChange, NickError> {
    let mut rng = OsRng;
    force_nick_with(matrix, client, session, &mut rng).await
}

/// [`force_nick`] with a caller-supplied random source.
///
/// The base is the current nick, or the nick requested during registration
/// while the client has none. Only collisions are retried; any other failure
/// is final, and so is running out of attempts.
pub async fn force_nick_with<R: RngCore + Send>(
    matrix: &Matrix,
    client: &Arc<Client>,
    session: Option<SessionId>,
    rng: &mut R,
) -> Result<NickChange, NickError> {
    let base = if client.has_nick() {
        client.nick()
    } else {
        client.prereg_nick()
    };
    if base.is_empty() {
        let err = NickError::NickMissing;
        let mut rb = ResponseBuffer::new(session);
        rb.add(err.to_irc_reply(matrix.server_name(), &client.nick()));
        rb.send(client).await;
        return Err(err);
    }

    let nicklen = matrix.nicks.policy().nicklen;
    for attempt in 1..=MAX_FORCE_NICK_ATTEMPTS {
        let candidate = derive_nick(&base, nicklen, rng);
        let mut rb = ResponseBuffer::new(session);
        let result = perform_nick_change(
            matrix,
            NickChangeRequest {
                actor: client,
                target: client,
                session,
                nick: &candidate,
            },
            &mut rb,
        )
        .await;

        match result {
            Err(NickError::NicknameInUse(_)) => {
                debug!(client = %client.id(), attempt, candidate = %candidate, "Derived nick collided");
            }
            Ok(change) => {
                rb.send(client).await;
                if let NickChange::Changed { .. } = &change {
                    metrics::record_forced_rename("collision");
                    info!(client = %client.id(), base = %base, new_nick = %candidate, "Client renamed after collision");
                }
                return Ok(change);
            }
            Err(e) => {
                rb.send(client).await;
                return Err(e);
            }
        }
    }

    let err = NickError::RenameExhausted(base);
    warn!(client = %client.id(), error = %err, "Collision recovery gave up");
    let mut rb = ResponseBuffer::new(session);
    rb.add(err.to_irc_reply(matrix.server_name(), &client.nick()));
    rb.send(client).await;
    Err(err)
}
