//! SaveSync Daemon - Background synchronization service
//!
//! This binary runs as a user service and handles:
//! - Watching resource directories and uploading changed file sets
//! - Periodic flushes and the initial sync
//! - Remote `sync` / `pull` commands queued on the server
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon restores the linked session, resolves the resource catalogs
//! against this machine, and hands everything to the [`SyncEngine`]. The
//! process then idles until a `CancellationToken` is triggered by a signal.
//!
//! If the server rejects the credential while the engine runs, the engine
//! is stopped and the daemon goes back to waiting for a linked session.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use savesync_api::{client::ApiClient, session_file::FileSessionStore};
use savesync_core::{
    catalog::Catalog,
    config::{Config, LogFormat},
    domain::Profile,
    usecases::{AuthenticateUseCase, SessionStatus},
};
use savesync_sync::{
    engine::{EnginePorts, EngineSettings, SyncEngine},
    resolver::resolve_catalog,
    watcher::NotifyEventSource,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// How often the daemon re-reads the session file while unlinked
const SESSION_CHECK_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// DaemonService
// ============================================================================

/// Main daemon service that owns the API client and the session lifecycle
struct DaemonService {
    /// Application configuration loaded from YAML
    config: Config,
    /// HTTP client shared by every port
    client: Arc<ApiClient>,
    /// Session restore against the session file
    auth: AuthenticateUseCase,
    /// Token for signalling graceful shutdown
    shutdown: CancellationToken,
}

impl DaemonService {
    fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        config.ensure_valid()?;

        let client = Arc::new(
            ApiClient::new(&config.server.url, config.request_timeout())
                .context("Failed to build API client")?,
        );
        let store = Arc::new(FileSessionStore::new(&config.session.file));
        let auth = AuthenticateUseCase::new(client.clone(), store);

        Ok(Self {
            config,
            client,
            auth,
            shutdown,
        })
    }

    /// Runs until shutdown
    ///
    /// Errors only when the engine cannot start.
    async fn run(&self) -> Result<()> {
        loop {
            let Some(profile) = self.wait_for_session().await? else {
                return Ok(());
            };
            info!(user = %profile.username, plan = %profile.plan, "Linked account");

            let engine = self.start_engine().await?;
            let rejected = engine.credential_rejected();

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    engine.shutdown().await;
                    return Ok(());
                }
                _ = rejected.cancelled() => {
                    warn!("Server rejected the session, pausing sync until the machine is linked again");
                    engine.shutdown().await;
                    self.client.set_credential(None);
                }
            }
        }
    }

    /// Resolves the catalogs and starts the engine over them
    async fn start_engine(&self) -> Result<SyncEngine> {
        let catalog = Catalog::load_configured(&self.config.catalog);
        let resources = resolve_catalog(&catalog);
        info!(
            catalog_entries = catalog.len(),
            resolved = resources.len(),
            "Resolved resources"
        );

        let ports = EnginePorts {
            gateway: self.client.clone(),
            commands: self.client.clone(),
            events: Arc::new(NotifyEventSource::new()),
        };
        SyncEngine::start(resources, ports, EngineSettings::from_config(&self.config))
            .await
            .context("Failed to start sync engine")
    }

    /// Restores the session, waiting for a link if there is none
    ///
    /// Returns `None` if shutdown was requested first.
    async fn wait_for_session(&self) -> Result<Option<Profile>> {
        let mut announced = false;

        loop {
            match self.auth.restore().await? {
                SessionStatus::Active {
                    credential,
                    profile,
                } => {
                    self.client.set_credential(Some(credential));
                    return Ok(Some(profile));
                }
                SessionStatus::NeedsLink => {
                    if !announced {
                        warn!("No linked account. Run 'savesync link <code>' to link this machine.");
                        announced = true;
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(SESSION_CHECK_INTERVAL) => {}
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received while waiting for a session");
                    return Ok(None);
                }
            }
        }
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

/// Loads the configuration and applies environment overrides
fn load_config() -> Config {
    let path = Config::default_path();
    let mut config = Config::load_or_default(&path);
    config.apply_env_overrides();
    config
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config();

    // RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init(),
    }

    info!(
        config_path = %Config::default_path().display(),
        server = %config.server.url,
        "SaveSync daemon starting (savesyncd)"
    );
    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let result = match DaemonService::new(config, shutdown_token) {
        Ok(service) => service.run().await,
        Err(e) => Err(e),
    };

    match &result {
        Ok(()) => info!("SaveSync daemon shut down gracefully"),
        Err(e) => error!(error = %format!("{e:#}"), "SaveSync daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
