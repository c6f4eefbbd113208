//! Restoring resources from the remote store
//!
//! A restore downloads the resource's archive and extracts it into the
//! resource's base directory (its first resolved root), creating the
//! directory if needed and overwriting existing files. Files that exist
//! locally but not in the archive are left alone.
//!
//! Callers go through [`SyncScheduler::restore`](crate::scheduler::SyncScheduler::restore),
//! which holds the resource's single-flight guard for the duration.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use savesync_core::domain::WatchedResource;
use savesync_core::ports::ITransferGateway;

use crate::SyncError;

/// Extracts a zip archive into `base_dir`
///
/// Entries whose names would resolve outside `base_dir` (absolute paths,
/// `..` components) abort the extraction. Returns the number of files
/// written.
pub fn extract_archive(bytes: &[u8], base_dir: &Path) -> Result<usize, SyncError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    fs::create_dir_all(base_dir)?;

    let mut written = 0usize;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            return Err(SyncError::PathEscapesBase(entry.name().to_string()));
        };
        let target: PathBuf = base_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        debug!(path = %target.display(), "Extracted file");
        written += 1;
    }

    Ok(written)
}

/// Downloads and extracts resource archives
pub struct RestoreService {
    gateway: Arc<dyn ITransferGateway>,
}

impl RestoreService {
    pub fn new(gateway: Arc<dyn ITransferGateway>) -> Self {
        Self { gateway }
    }

    /// Restores one resource into its base directory
    pub async fn restore(&self, resource: &WatchedResource) -> Result<usize> {
        let id = resource.id();
        let bytes = self
            .gateway
            .download(id)
            .await
            .with_context(|| format!("Failed to download {id}"))?;

        let base_dir = resource.base_dir().to_path_buf();
        let target = base_dir.clone();
        let written = tokio::task::spawn_blocking(move || extract_archive(&bytes, &target))
            .await
            .context("Extraction task panicked")?
            .with_context(|| format!("Failed to extract {id} into {}", base_dir.display()))?;

        info!(resource = %id, files = written, path = %base_dir.display(), "Restored resource");
        Ok(written)
    }
}
