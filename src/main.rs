//! slircd-identity - Straylight IRC Daemon identity service.
//!
//! Loads the configuration, builds the shared state and runs the nick
//! enforcement sweep until interrupted.

use slircd_identity::config::{Config, LogFormat};
use slircd_identity::metrics;
use slircd_identity::services::MemoryAccounts;
use slircd_identity::services::enforce::spawn_enforcement_task;
use slircd_identity::state::Matrix;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            // Tracing is configured from the file, so report with defaults.
            init_tracing(&Config::default());
            error!(path = %config_path, error = %e, "Failed to load config");
            return Err(e.into());
        }
    };
    init_tracing(&config);

    info!(
        server = %config.server.name,
        network = %config.server.network,
        casemapping = slirc_casefold::casemapping_name(),
        "Starting slircd-identity"
    );

    metrics::init();

    info!(
        method = ?config.accounts.nick_reservation.effective_method(),
        restricted = config.accounts.nick_reservation.reserved_nicks.len(),
        "Nick reservation policy"
    );
    let accounts = Arc::new(MemoryAccounts::new());
    let matrix = Arc::new(Matrix::new(config, accounts));

    let enforcement = spawn_enforcement_task(Arc::clone(&matrix));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    enforcement.abort();

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
