//! Resource snapshots
//!
//! A flush never uploads just the changed paths. It lists every regular file
//! currently under the resource's roots, applies the same filters as the
//! watcher, and uploads the whole set. Relative paths are taken from the
//! root each file was found under and always use `/` separators.

use std::path::{Component, Path};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use savesync_core::domain::{WatchRoot, WatchedResource};
use savesync_core::ports::UploadFile;

use crate::filter;

fn to_wire_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn collect_root(root: &WatchRoot, files: &mut Vec<UploadFile>) {
    for entry in WalkDir::new(&root.dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(relative) = filter::admit(root, entry.path()) else {
            continue;
        };

        match std::fs::read(entry.path()) {
            Ok(bytes) => files.push(UploadFile::new(to_wire_path(relative), bytes)),
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Failed to read file"),
        }
    }
}

/// Lists and reads every admitted file of `resource` (blocking)
pub fn collect(resource: &WatchedResource) -> Vec<UploadFile> {
    let mut files = Vec::new();
    for root in resource.roots() {
        collect_root(root, &mut files);
    }
    debug!(resource = %resource.id(), files = files.len(), "Snapshot collected");
    files
}

/// Async wrapper around [`collect`] that runs on the blocking pool
pub async fn take(resource: &WatchedResource) -> Result<Vec<UploadFile>> {
    let resource = resource.clone();
    tokio::task::spawn_blocking(move || collect(&resource))
        .await
        .context("Snapshot task panicked")
}

/// Whether `resource` currently has at least one admitted file
pub fn has_files(resource: &WatchedResource) -> bool {
    resource.roots().iter().any(|root| {
        WalkDir::new(&root.dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .any(|entry| {
                entry.file_type().is_file() && filter::admit(root, entry.path()).is_some()
            })
    })
}
