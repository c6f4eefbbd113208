//! Session store port
//!
//! Persists the bearer credential across process restarts. The engine treats
//! the store as a cache: a loaded credential is always verified remotely
//! before use.

use crate::domain::Credential;

/// Port trait for the local credential cache
pub trait ISessionStore: Send + Sync {
    /// Returns the cached credential, or `None` if nothing is stored
    fn load(&self) -> anyhow::Result<Option<Credential>>;

    /// Replaces the cached credential
    fn save(&self, credential: &Credential) -> anyhow::Result<()>;

    /// Removes the cached credential; succeeds if nothing was stored
    fn clear(&self) -> anyhow::Result<()>;
}
