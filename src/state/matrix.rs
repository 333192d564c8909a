//! The Matrix - Central shared state for the server.
//!
//! The Matrix holds the nickname registry, clients, channels and the
//! side tables (MONITOR, WHOWAS, enforcement timers) behind concurrent data
//! structures accessible from any async task.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::{Config, EnforcementMethod};
use crate::message::Message;
use crate::metrics;
use crate::services::AccountStore;
use crate::state::{
    AttachResult, ChannelManager, Client, ClientId, ClientManager, DetachResult, IdentitySnapshot,
    MonitorManager, NickPolicy, NickRegistry, SessionId, Snomask, WhowasEntry, WhowasList,
};

/// The Matrix - Central shared state container.
pub struct Matrix {
    /// Server configuration (for handlers to access).
    pub config: Config,

    /// Canonical nick → client, the only owner of that mapping.
    pub nicks: NickRegistry,

    /// All connected clients and their sessions.
    pub clients: ClientManager,

    /// All channels, indexed by casefolded name.
    pub channels: ChannelManager,

    /// MONITOR subscriptions.
    pub monitors: MonitorManager,

    /// WHOWAS history of vacated identities.
    pub whowas: WhowasList,

    /// Account collaborator consulted for nick reservations.
    pub accounts: Arc<dyn AccountStore>,

    /// Nick enforcement timers: client -> deadline when it will be renamed.
    pub enforce_timers: DashMap<ClientId, Instant>,
}

impl Matrix {
    pub fn new(config: Config, accounts: Arc<dyn AccountStore>) -> Self {
        let nicks = NickRegistry::new(NickPolicy::from_config(&config), Arc::clone(&accounts));
        let clients = ClientManager::new(config.multiclient.clone(), config.history.client_length());
        let channels = ChannelManager::new(
            config.history.channel_length(),
            config.history.autoreplay_on_join,
        );
        let monitors = MonitorManager::new(config.limits.monitor_entries);
        let whowas = WhowasList::new(config.limits.whowas_entries);

        Self {
            config,
            nicks,
            clients,
            channels,
            monitors,
            whowas,
            accounts,
            enforce_timers: DashMap::new(),
        }
    }

    /// Name used as the prefix of server replies.
    pub fn server_name(&self) -> &str {
        &self.config.server.name
    }

    /// Accept a new transport connection as a fresh, unregistered client.
    pub fn connect(&self, sender: mpsc::Sender<Arc<Message>>, hostname: &str) -> (Arc<Client>, SessionId) {
        let connected = self.clients.connect(sender, hostname);
        metrics::set_connected_clients(self.clients.len());
        connected
    }

    /// Attach another session to an existing (logged-in) client.
    pub fn attach_session(&self, client: &Arc<Client>, sender: mpsc::Sender<Arc<Message>>) -> AttachResult {
        self.clients.attach_session(client, sender)
    }

    /// Finish the handshake once a nick is held.
    ///
    /// Returns `false` if the client has no nick or was already registered.
    pub async fn complete_registration(&self, client: &Arc<Client>) -> bool {
        if !client.has_nick() || !client.set_registered() {
            return false;
        }
        let snapshot = client.snapshot();
        info!(client = %client.id(), nick = %snapshot.nick, "Client registered");
        self.monitors
            .alert_about(self.server_name(), None, Some(&snapshot))
            .await;
        true
    }

    /// Detach a session, tearing the client down with its last one.
    ///
    /// Teardown releases the nick, records WHOWAS, parts every channel, drops
    /// the client's MONITOR list and tells watchers the nick went offline.
    pub async fn detach_session(&self, session_id: SessionId, reason: Option<&str>) -> DetachResult {
        let result = self.clients.detach_session(session_id);
        if let DetachResult::Destroyed(client) = &result {
            self.destroy_client(client, reason).await;
        }
        result
    }

    async fn destroy_client(&self, client: &Arc<Client>, reason: Option<&str>) {
        // Let an in-flight rename finish announcing; later ones are no-ops.
        let _gate = client.lock_renames().await;
        let snapshot = client.snapshot();
        let was_registered = client.is_registered();

        self.nicks.release(client);
        if snapshot.has_nick() {
            self.record_whowas(&snapshot);
        }
        let parted = self.channels.remove_client(client, &snapshot.mask(), reason);
        self.monitors.clear(client.id());
        self.enforce_timers.remove(&client.id());

        if was_registered {
            self.monitors
                .alert_about(self.server_name(), Some(&snapshot), None)
                .await;
        }

        metrics::set_connected_clients(self.clients.len());
        debug!(
            client = %client.id(),
            nick = %snapshot.nick,
            channels = parted,
            "Client destroyed"
        );
    }

    /// Append a vacated identity to WHOWAS.
    pub fn record_whowas(&self, snapshot: &IdentitySnapshot) {
        self.whowas
            .append(WhowasEntry::from_snapshot(snapshot, self.server_name()));
    }

    /// Send a server notice to every operator subscribed to `mask`.
    pub async fn send_snomask(&self, mask: Snomask, text: &str) {
        let msg = Arc::new(Message::server_notice(
            self.server_name(),
            "*",
            format!("*** Notice -- {text}"),
        ));

        let recipients: Vec<_> = self
            .clients
            .all()
            .into_iter()
            .filter(|client| client.has_snomask(mask))
            .collect();
        for client in recipients {
            for session in client.sessions() {
                session.send(Arc::clone(&msg)).await;
            }
        }
    }

    /// Arm or disarm the rename deadline after a successful nick change.
    ///
    /// Only the `timeout` enforcement method uses deadlines.
    pub fn touch_nick_timer(&self, client: ClientId, needs_enforcement: bool) {
        let reservation = &self.config.accounts.nick_reservation;
        if needs_enforcement && reservation.effective_method() == EnforcementMethod::Timeout {
            let deadline = Instant::now() + reservation.rename_timeout();
            self.enforce_timers.insert(client, deadline);
        } else {
            self.enforce_timers.remove(&client);
        }
    }
}
