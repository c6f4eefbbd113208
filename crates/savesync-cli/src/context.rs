//! Shared setup for CLI commands
//!
//! Every command starts from the same configuration, API client and session
//! file. Commands that talk to protected endpoints call
//! [`CliContext::authenticated`] first.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use savesync_api::{client::ApiClient, session_file::FileSessionStore};
use savesync_core::{
    catalog::Catalog,
    config::Config,
    domain::{Profile, WatchedResource},
    usecases::{AuthenticateUseCase, SessionStatus},
};
use savesync_sync::resolver::resolve_catalog;

pub struct CliContext {
    pub config: Config,
    pub client: Arc<ApiClient>,
    pub store: Arc<FileSessionStore>,
}

impl CliContext {
    /// Loads the configuration (from `config_path` or the default location)
    /// and builds the API client
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Config::default_path);
        let config = load_config(&path)?;
        Self::from_config(config)
    }

    /// Builds the context from an already loaded configuration
    ///
    /// # Errors
    /// Fails if the configuration does not validate.
    pub fn from_config(config: Config) -> Result<Self> {
        config.ensure_valid()?;

        let client = Arc::new(
            ApiClient::new(&config.server.url, config.request_timeout())
                .context("Failed to build API client")?,
        );
        let store = Arc::new(FileSessionStore::new(&config.session.file));
        Ok(Self {
            config,
            client,
            store,
        })
    }

    pub fn auth(&self) -> AuthenticateUseCase {
        AuthenticateUseCase::new(self.client.clone(), self.store.clone())
    }

    /// Restores the linked session and installs its credential on the client
    pub async fn authenticated(&self) -> Result<Profile> {
        match self.auth().restore().await? {
            SessionStatus::Active {
                credential,
                profile,
            } => {
                self.client.set_credential(Some(credential));
                Ok(profile)
            }
            SessionStatus::NeedsLink => {
                bail!("This machine is not linked. Run 'savesync link <code>' first.")
            }
        }
    }

    /// Loads the catalogs and resolves them against this machine
    pub fn resources(&self) -> (Catalog, Vec<WatchedResource>) {
        let catalog = Catalog::load_configured(&self.config.catalog);
        let resources = resolve_catalog(&catalog);
        (catalog, resources)
    }
}

/// Reads an explicit config file strictly; the default location may be absent
fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        debug!(path = %path.display(), "No config file, using defaults");
        Config::default()
    };
    config.apply_env_overrides();
    Ok(config)
}
