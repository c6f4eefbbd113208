//! Save transfer endpoints
//!
//! - `POST /api/saves/upload` (multipart: `gameId` + one `files` part per file)
//! - `GET /api/saves/download/{id}` (zip archive)
//! - `DELETE /api/saves/{id}`
//! - `GET /api/saves/list[?gameId=...]`

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use savesync_core::domain::ResourceId;
use savesync_core::ports::{ITransferGateway, UploadFile};

use crate::client::ApiClient;

/// One stored file as reported by the list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSave {
    pub key: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    saves: Vec<RemoteSave>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    uploaded: Option<usize>,
}

impl ApiClient {
    /// Lists stored files, optionally for one resource
    pub async fn list_saves(&self, resource: Option<&ResourceId>) -> Result<Vec<RemoteSave>> {
        let mut builder = self.request(Method::GET, "/api/saves/list");
        if let Some(id) = resource {
            builder = builder.query(&[("gameId", id.as_str())]);
        }

        let list: ListResponse = self
            .send(builder)
            .await
            .context("GET /api/saves/list failed")?
            .json()
            .await
            .context("Failed to parse save list")?;
        Ok(list.saves)
    }
}

#[async_trait::async_trait]
impl ITransferGateway for ApiClient {
    async fn upload(&self, resource: &ResourceId, files: Vec<UploadFile>) -> Result<()> {
        let count = files.len();
        let mut form = Form::new().text("gameId", resource.as_str().to_string());
        for file in files {
            let part = Part::bytes(file.bytes).file_name(file.relative_path);
            form = form.part("files", part);
        }

        let response: UploadResponse = self
            .send(self.request(Method::POST, "/api/saves/upload").multipart(form))
            .await
            .with_context(|| format!("Upload of {resource} failed"))?
            .json()
            .await
            .unwrap_or(UploadResponse { uploaded: None });

        info!(
            resource = %resource,
            files = count,
            stored = response.uploaded.unwrap_or(count),
            "Upload accepted"
        );
        Ok(())
    }

    async fn download(&self, resource: &ResourceId) -> Result<Vec<u8>> {
        let path = format!("/api/saves/download/{}", resource.as_str());
        let bytes = self
            .send(self.request(Method::GET, &path))
            .await
            .with_context(|| format!("Download of {resource} failed"))?
            .bytes()
            .await
            .context("Failed to read download response body")?;

        debug!(resource = %resource, bytes = bytes.len(), "Downloaded archive");
        Ok(bytes.to_vec())
    }

    async fn delete(&self, resource: &ResourceId) -> Result<()> {
        let path = format!("/api/saves/{}", resource.as_str());
        self.send(self.request(Method::DELETE, &path))
            .await
            .with_context(|| format!("Delete of {resource} failed"))?;
        info!(resource = %resource, "Deleted remote saves");
        Ok(())
    }
}
