//! SaveSync API client
//!
//! Provides a typed HTTP client for the SaveSync server. Handles the base
//! URL, the request timeout, the bearer credential and error mapping. The
//! port implementations live in the sibling modules.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use savesync_api::client::ApiClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ApiClient::new("http://localhost:3000", Duration::from_secs(30))?;
//! let saves = client.list_saves(None).await?;
//! println!("{} files stored", saves.len());
//! # Ok(())
//! # }
//! ```

use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;

use savesync_core::domain::Credential;

use crate::ApiError;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for SaveSync API calls
///
/// The credential can be swapped at runtime (after linking or logging out);
/// requests made without one are sent unauthenticated and typically come
/// back as [`ApiError::Unauthorized`].
pub struct ApiClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL without a trailing slash
    base_url: String,
    /// Current bearer credential
    credential: RwLock<Option<Credential>>,
}

impl ApiClient {
    /// Creates a client for `base_url` with the given request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            credential: RwLock::new(None),
        })
    }

    /// Sets the credential at construction time
    pub fn with_credential(self, credential: Credential) -> Self {
        self.set_credential(Some(credential));
        self
    }

    /// Replaces (or clears) the current credential
    pub fn set_credential(&self, credential: Option<Credential>) {
        if let Ok(mut slot) = self.credential.write() {
            *slot = credential;
        }
        debug!("Updated API credential");
    }

    pub fn credential(&self) -> Option<Credential> {
        self.credential.read().ok().and_then(|c| c.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates a request builder for `path`, adding the bearer credential
    /// when one is set
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, &url);
        match self.credential() {
            Some(credential) => builder.bearer_auth(credential.as_str()),
            None => builder,
        }
    }

    /// Like [`request`](Self::request) but with an explicit credential
    pub(crate) fn request_as(
        &self,
        method: Method,
        path: &str,
        credential: &Credential,
    ) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(credential.as_str())
    }

    /// Sends a request and turns non-success statuses into [`ApiError`]
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "API request failed");
        Err(ApiError::from_status(status, &body))
    }
}
