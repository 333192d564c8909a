//! Test server: a `Matrix` built from an in-memory config.

use slircd_identity::config::Config;
use slircd_identity::services::MemoryAccounts;
use slircd_identity::state::{AttachResult, Matrix};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::client::TestClient;

/// Capacity of every test session queue.
pub const QUEUE_DEPTH: usize = 64;

#[allow(dead_code)]
pub struct TestServer {
    pub matrix: Arc<Matrix>,
    pub accounts: Arc<MemoryAccounts>,
}

#[allow(dead_code)]
impl TestServer {
    /// Server with default configuration, server name `irc.test`.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Server with a tweaked default configuration.
    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::default();
        config.server.name = "irc.test".to_string();
        tweak(&mut config);

        let accounts = Arc::new(MemoryAccounts::new());
        let matrix = Arc::new(Matrix::new(config, accounts.clone()));
        Self { matrix, accounts }
    }

    /// Connect a client without a nick.
    pub fn connect(&self) -> TestClient {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let (client, session) = self.matrix.connect(tx, "test.host");
        TestClient::new(client, session, rx)
    }

    /// Connect a client, give it `nick` and complete registration.
    pub async fn register(&self, nick: &str) -> TestClient {
        let mut test_client = self.connect();
        test_client.client.set_user(&nick.to_lowercase(), nick);
        self.matrix
            .nicks
            .set_nick(&test_client.client, nick)
            .expect("nick available");
        assert!(self.matrix.complete_registration(&test_client.client).await);
        test_client.drain();
        test_client
    }

    /// Attach another session to a logged-in client, returning its index.
    pub fn attach(&self, test_client: &mut TestClient) -> usize {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        match self.matrix.attach_session(&test_client.client, tx) {
            AttachResult::Attached { session_id, .. } => test_client.add_session(session_id, rx),
            other => panic!("attach failed: {other:?}"),
        }
    }
}
