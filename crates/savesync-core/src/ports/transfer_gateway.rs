//! Transfer gateway port (driven/secondary port)
//!
//! This module defines the interface the sync engine uses to move resource
//! content to and from the remote store. The engine only depends on this
//! contract; the HTTP implementation lives in `savesync-api`.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific.
//! - Uploads always carry the full current file set of a resource; there is
//!   no delta transfer.

use crate::domain::ResourceId;

/// A file queued for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Path relative to the watch root the file was found under, always
    /// `/`-separated regardless of platform
    pub relative_path: String,
    /// File content at the time the snapshot was taken
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(relative_path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            relative_path: relative_path.into(),
            bytes,
        }
    }
}

/// Port trait for remote storage of resource content
#[async_trait::async_trait]
pub trait ITransferGateway: Send + Sync {
    /// Uploads the full file set of a resource
    ///
    /// # Arguments
    /// * `resource` - The resource the files belong to
    /// * `files` - Every file currently present, with relative paths
    async fn upload(&self, resource: &ResourceId, files: Vec<UploadFile>) -> anyhow::Result<()>;

    /// Downloads the resource's current remote file set as a single zip archive
    async fn download(&self, resource: &ResourceId) -> anyhow::Result<Vec<u8>>;

    /// Deletes every remote file of a resource
    async fn delete(&self, resource: &ResourceId) -> anyhow::Result<()>;
}
