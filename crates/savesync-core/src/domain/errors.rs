//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! such as malformed resource identifiers or link codes.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource identifier is empty or contains characters that cannot
    /// appear in a remote path segment
    #[error("Invalid resource id: {0}")]
    InvalidResourceId(String),

    /// Link code does not have the expected shape
    #[error("Invalid link code: {0}")]
    InvalidLinkCode(String),

    /// Credential string is empty
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// The server no longer accepts the session credential
///
/// Adapters put this in the error chain of any call answered with an
/// authentication failure, so callers holding only an `anyhow::Error` can
/// tell a revoked session apart from a transient failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CredentialRejected(pub String);

impl CredentialRejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// Whether `err` or any of its causes is a [`CredentialRejected`]
    pub fn in_chain(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| cause.is::<CredentialRejected>())
    }
}
