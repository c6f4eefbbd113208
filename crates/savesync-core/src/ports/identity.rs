//! Identity provider port
//!
//! Account linking and credential verification against the remote API.

use crate::domain::{Credential, LinkCode, LinkedSession, Verification};

/// Port trait for account linking
#[async_trait::async_trait]
pub trait IIdentityProvider: Send + Sync {
    /// Checks whether `credential` is still accepted by the server
    ///
    /// A rejected credential is `Ok(Verification::Invalid)`; `Err` is kept
    /// for transport failures.
    async fn verify(&self, credential: &Credential) -> anyhow::Result<Verification>;

    /// Exchanges a link code for a new credential
    async fn link(&self, code: &LinkCode) -> anyhow::Result<LinkedSession>;

    /// Invalidates `credential` on the server
    async fn logout(&self, credential: &Credential) -> anyhow::Result<()>;
}
