//! SaveSync API - HTTP adapters for the SaveSync server
//!
//! Provides:
//! - [`client::ApiClient`], a bearer-authenticated HTTP client that
//!   implements the transfer, command and identity ports
//! - [`session_file::FileSessionStore`], the JSON file credential cache
//!
//! ## Modules
//!
//! - [`client`] - HTTP client, base URL and credential handling
//! - [`saves`] - Upload / download / delete / list of resource saves
//! - [`commands`] - Pending remote commands and completion reports
//! - [`identity`] - Link codes, verification and logout
//! - [`session_file`] - Session persistence on disk

pub mod client;
pub mod commands;
pub mod identity;
pub mod saves;
pub mod session_file;

use reqwest::StatusCode;
use thiserror::Error;

use savesync_core::domain::CredentialRejected;

/// Errors that can occur when communicating with the SaveSync API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The credential is missing, invalid or revoked
    #[error("Unauthorized: {0}")]
    Unauthorized(#[source] CredentialRejected),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request was rejected as malformed
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Maps a non-success status and its body to an error
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| format!("HTTP {status}"));

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(CredentialRejected::new(message)),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            s if s.is_server_error() => ApiError::ServerError(message),
            s if s.is_client_error() => ApiError::BadRequest(message),
            _ => ApiError::InvalidResponse(message),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}
