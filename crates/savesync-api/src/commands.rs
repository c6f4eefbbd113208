//! Remote command endpoints
//!
//! - `GET /api/sync-requests/pending` returns `{ requests: [...] }`; the
//!   server marks returned requests as processed
//! - `POST /api/sync-requests/complete` with `{ requestType, success }`

use anyhow::{Context, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use savesync_core::domain::{CommandKind, RemoteCommand};
use savesync_core::ports::ICommandChannel;

use crate::client::ApiClient;

#[derive(Debug, Deserialize)]
struct PendingResponse {
    #[serde(default)]
    requests: Vec<RemoteCommand>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionReport<'a> {
    request_type: &'a str,
    success: bool,
}

#[async_trait::async_trait]
impl ICommandChannel for ApiClient {
    async fn poll(&self) -> Result<Vec<RemoteCommand>> {
        let pending: PendingResponse = self
            .send(self.request(Method::GET, "/api/sync-requests/pending"))
            .await
            .context("GET /api/sync-requests/pending failed")?
            .json()
            .await
            .context("Failed to parse pending requests")?;

        if !pending.requests.is_empty() {
            debug!(count = pending.requests.len(), "Fetched pending commands");
        }
        Ok(pending.requests)
    }

    async fn report_completion(&self, kind: CommandKind, success: bool) -> Result<()> {
        let report = CompletionReport {
            request_type: kind.as_str(),
            success,
        };
        self.send(
            self.request(Method::POST, "/api/sync-requests/complete")
                .json(&report),
        )
        .await
        .context("POST /api/sync-requests/complete failed")?;
        Ok(())
    }
}
