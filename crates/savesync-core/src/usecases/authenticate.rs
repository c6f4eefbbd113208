//! Authentication use case
//!
//! Links this machine to a user account with a short code, restores the
//! cached credential at startup, and logs out. Remote calls go through the
//! identity port; the credential is cached through the session store port.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    domain::{Credential, LinkCode, LinkedSession, Profile, Verification},
    ports::{IIdentityProvider, ISessionStore},
};

/// Outcome of restoring the cached session at startup
#[derive(Debug, Clone)]
pub enum SessionStatus {
    /// The cached credential was accepted by the server
    Active {
        credential: Credential,
        profile: Profile,
    },
    /// No usable credential; the user must link again
    NeedsLink,
}

/// Use case for account linking and session lifecycle
pub struct AuthenticateUseCase {
    identity: Arc<dyn IIdentityProvider>,
    store: Arc<dyn ISessionStore>,
}

impl AuthenticateUseCase {
    pub fn new(identity: Arc<dyn IIdentityProvider>, store: Arc<dyn ISessionStore>) -> Self {
        Self { identity, store }
    }

    /// Loads the cached credential and verifies it remotely
    ///
    /// Any verification failure, including transport errors, clears the
    /// cache and returns [`SessionStatus::NeedsLink`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the session store itself cannot be read.
    pub async fn restore(&self) -> Result<SessionStatus> {
        let Some(credential) = self.store.load().context("Failed to read session store")? else {
            debug!("No cached session");
            return Ok(SessionStatus::NeedsLink);
        };

        match self.identity.verify(&credential).await {
            Ok(Verification::Valid(profile)) => {
                info!(user = %profile.username, "Session restored");
                Ok(SessionStatus::Active {
                    credential,
                    profile,
                })
            }
            Ok(Verification::Invalid) => {
                warn!("Cached session was rejected by the server");
                self.clear_quietly();
                Ok(SessionStatus::NeedsLink)
            }
            Err(e) => {
                warn!(error = %e, "Session verification failed");
                self.clear_quietly();
                Ok(SessionStatus::NeedsLink)
            }
        }
    }

    /// Exchanges a link code for a credential and caches it
    ///
    /// # Errors
    ///
    /// Returns an error if the code is malformed, the server rejects it, or
    /// the credential cannot be persisted.
    pub async fn link(&self, code: &str) -> Result<LinkedSession> {
        let code = LinkCode::new(code)?;
        let session = self
            .identity
            .link(&code)
            .await
            .context("Failed to link account")?;

        self.store
            .save(&session.credential)
            .context("Failed to save session")?;

        info!(user = %session.profile.username, "Account linked");
        Ok(session)
    }

    /// Logs out remotely (best-effort) and always clears the local cache
    ///
    /// # Errors
    ///
    /// Returns an error only if the local cache cannot be cleared.
    pub async fn logout(&self) -> Result<()> {
        match self.store.load() {
            Ok(Some(credential)) => {
                if let Err(e) = self.identity.logout(&credential).await {
                    warn!(error = %e, "Remote logout failed; clearing local session anyway");
                }
            }
            Ok(None) => debug!("No cached session to log out"),
            Err(e) => warn!(error = %e, "Failed to read session store during logout"),
        }

        self.store.clear().context("Failed to clear session")?;
        info!("Logged out");
        Ok(())
    }

    fn clear_quietly(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session store");
        }
    }
}
