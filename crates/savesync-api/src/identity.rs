//! Account linking endpoints
//!
//! - `POST /api/auth/link` with `{ code }` returns `{ sessionId, user }`
//! - `GET /api/auth/verify` returns `{ valid, user }`, or 401
//! - `POST /api/auth/logout`

use anyhow::{Context, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use savesync_core::domain::{Credential, LinkCode, LinkedSession, Profile, Verification};
use savesync_core::ports::IIdentityProvider;

use crate::client::ApiClient;
use crate::ApiError;

#[derive(Debug, Serialize)]
struct LinkRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkResponse {
    session_id: String,
    user: Profile,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    user: Option<Profile>,
}

#[async_trait::async_trait]
impl IIdentityProvider for ApiClient {
    async fn verify(&self, credential: &Credential) -> Result<Verification> {
        let response = match self
            .send(self.request_as(Method::GET, "/api/auth/verify", credential))
            .await
        {
            Ok(response) => response,
            Err(ApiError::Unauthorized(reason)) => {
                debug!(reason = %reason, "Credential rejected");
                return Ok(Verification::Invalid);
            }
            Err(e) => return Err(e).context("GET /api/auth/verify failed"),
        };

        let body: VerifyResponse = response
            .json()
            .await
            .context("Failed to parse verify response")?;

        match (body.valid, body.user) {
            (true, Some(profile)) => Ok(Verification::Valid(profile)),
            _ => Ok(Verification::Invalid),
        }
    }

    async fn link(&self, code: &LinkCode) -> Result<LinkedSession> {
        let body: LinkResponse = self
            .send(
                self.request(Method::POST, "/api/auth/link")
                    .json(&LinkRequest { code: code.as_str() }),
            )
            .await
            .context("Link request failed")?
            .json()
            .await
            .context("Failed to parse link response")?;

        let credential = Credential::new(body.session_id)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        info!(username = %body.user.username, "Account linked");

        Ok(LinkedSession {
            credential,
            profile: body.user,
        })
    }

    async fn logout(&self, credential: &Credential) -> Result<()> {
        self.send(self.request_as(Method::POST, "/api/auth/logout", credential))
            .await
            .context("Logout request failed")?;
        Ok(())
    }
}
