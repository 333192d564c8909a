//! Nick enforcement background task.
//!
//! Monitors enforce_timers in the Matrix and force-renames clients still
//! holding a nick reserved by someone else's account once their deadline
//! passes.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::handlers::randomly_rename;
use crate::message::Message;
use crate::state::{ClientId, Matrix, NickChange};

/// How often deadlines are checked.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Spawn the nick enforcement background task.
///
/// This task runs every [`SWEEP_INTERVAL`] and checks for expired timers.
pub fn spawn_enforcement_task(matrix: Arc<Matrix>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            interval.tick().await;
            check_expired_timers(&matrix, Instant::now()).await;
        }
    })
}

/// Rename every client whose deadline is at or before `now`.
///
/// Returns how many clients were renamed.
pub async fn check_expired_timers(matrix: &Matrix, now: Instant) -> usize {
    // Collect first so no map guard is held while renaming.
    let expired: Vec<ClientId> = matrix
        .enforce_timers
        .iter()
        .filter(|entry| *entry.value() <= now)
        .map(|entry| *entry.key())
        .collect();

    let mut renamed = 0;
    for id in expired {
        // A rename since the sweep started may have re-armed the timer.
        if matrix
            .enforce_timers
            .remove_if(&id, |_, deadline| *deadline <= now)
            .is_none()
        {
            continue;
        }

        let Some(client) = matrix.clients.get(id) else {
            debug!(client = %id, "Client not found for enforcement (already disconnected?)");
            continue;
        };
        if !matrix
            .nicks
            .reserved_for_other(&client.nick_cf(), client.account_cf().as_deref())
        {
            continue;
        }

        info!(client = %id, nick = %client.nick(), "Nick enforcement: forcing nick change");
        if let Ok(NickChange::Changed { nick, .. }) = randomly_rename(matrix, &client).await {
            let notice = Arc::new(Message::server_notice(
                matrix.server_name(),
                nick.clone(),
                format!(
                    "Your nickname has been changed to \x02{nick}\x02 because you did not identify in time."
                ),
            ));
            for session in client.sessions() {
                session.send(Arc::clone(&notice)).await;
            }
            renamed += 1;
        }
    }
    renamed
}
