//! File watching
//!
//! Provides [`NotifyEventSource`], the `notify`-backed implementation of
//! [`IFileEventSource`]. Raw OS events are converted into [`FsEvent`] values
//! and pushed through an mpsc channel to whoever holds the subscription.
//!
//! ## Architecture
//!
//! ```text
//! inotify / FSEvents / ReadDirectoryChangesW
//!       │
//!       ▼
//!  RecommendedWatcher  ──→  mpsc::channel  ──→  ChangeAggregator
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use savesync_core::ports::{EventSubscription, FsEvent, IFileEventSource};

/// Capacity of the per-subscription event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Watches directories recursively using the OS-native mechanism
///
/// Every call to [`subscribe`](IFileEventSource::subscribe) creates its own
/// watcher, owned by the returned subscription. Dropping the subscription
/// drops the watcher and releases the OS watches.
#[derive(Debug, Default)]
pub struct NotifyEventSource;

impl NotifyEventSource {
    pub fn new() -> Self {
        Self
    }
}

impl IFileEventSource for NotifyEventSource {
    fn subscribe(&self, directories: &[PathBuf]) -> Result<EventSubscription> {
        let (event_tx, event_rx) = mpsc::channel::<FsEvent>(EVENT_CHANNEL_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for change in map_notify_event(&event) {
                        if let Err(e) = event_tx.blocking_send(change) {
                            warn!(error = %e, "Failed to send change event (receiver dropped)");
                            break;
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "File watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        let mut watched = 0usize;
        for dir in directories {
            match watcher.watch(dir, RecursiveMode::Recursive) {
                Ok(()) => {
                    info!(path = %dir.display(), "Starting recursive watch");
                    watched += 1;
                }
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Failed to watch path");
                }
            }
        }

        if watched == 0 {
            anyhow::bail!("None of {} directories could be watched", directories.len());
        }

        Ok(EventSubscription::new(event_rx, move || {
            drop(watcher);
            debug!("File watcher stopped");
        }))
    }
}

/// Converts a `notify::Event` into zero or more [`FsEvent`]s
///
/// Maps the notify event kinds as follows:
/// - `Create(*)` -> `Created`
/// - `Modify(Name(Both))` with 2 paths -> `Removed(old)` + `Created(new)`
/// - `Remove(*)` -> `Removed`
/// - Other `Modify(*)` -> `Modified`
///
/// Access events and events without paths produce nothing.
fn map_notify_event(event: &notify::Event) -> Vec<FsEvent> {
    let paths = &event.paths;
    let Some(first) = paths.first() else {
        return Vec::new();
    };

    match &event.kind {
        EventKind::Create(_) => vec![FsEvent::created(first.clone())],

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            debug!(
                old = %paths[0].display(),
                new = %paths[1].display(),
                "Mapped Rename event"
            );
            vec![
                FsEvent::removed(paths[0].clone()),
                FsEvent::created(paths[1].clone()),
            ]
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            vec![FsEvent::removed(first.clone())]
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            vec![FsEvent::created(first.clone())]
        }

        EventKind::Modify(_) => vec![FsEvent::modified(first.clone())],

        EventKind::Remove(_) => vec![FsEvent::removed(first.clone())],

        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            Vec::new()
        }
    }
}
