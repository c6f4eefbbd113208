//! Change aggregation
//!
//! The [`ChangeAggregator`] turns a stream of filesystem events into one
//! pending set per resource. A pending set only records membership: a path
//! that was created and then removed still counts as changed, because the
//! next flush uploads the live directory listing anyway.
//!
//! ## Flow
//!
//! ```text
//! IFileEventSource ──→ mpsc::Receiver ──→ ChangeAggregator::record ──→ pending set
//!                                                                         │
//!                                                       SyncScheduler::take (on flush)
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use savesync_core::domain::{ResourceId, WatchedResource};
use savesync_core::ports::FsEvent;

use crate::filter;

/// Pending change sets keyed by resource
#[derive(Debug, Default)]
pub struct ChangeAggregator {
    pending: DashMap<ResourceId, HashSet<PathBuf>>,
}

impl ChangeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event for `resource`
    ///
    /// Returns true if the path was admitted by the filters. Paths outside
    /// every root of the resource are ignored.
    pub fn record(&self, resource: &WatchedResource, event: &FsEvent) -> bool {
        let Some(root) = resource.root_for(&event.path) else {
            trace!(resource = %resource.id(), path = %event.path.display(), "Event outside watch roots");
            return false;
        };

        if filter::admit(root, &event.path).is_none() {
            trace!(resource = %resource.id(), path = %event.path.display(), "Filtered event");
            return false;
        }

        debug!(
            resource = %resource.id(),
            path = %event.path.display(),
            kind = ?event.kind,
            "Recorded change"
        );
        self.pending
            .entry(resource.id().clone())
            .or_default()
            .insert(event.path.clone());
        true
    }

    /// Atomically removes and returns the pending set of `id`
    pub fn take(&self, id: &ResourceId) -> HashSet<PathBuf> {
        self.pending
            .remove(id)
            .map(|(_, paths)| paths)
            .unwrap_or_default()
    }

    /// Number of pending paths for `id`
    pub fn pending_count(&self, id: &ResourceId) -> usize {
        self.pending.get(id).map(|paths| paths.len()).unwrap_or(0)
    }

    /// Number of pending paths across all resources
    pub fn total_pending(&self) -> usize {
        self.pending.iter().map(|entry| entry.value().len()).sum()
    }

    /// Feeds every event from `events` into the pending set of `resource`
    ///
    /// The task ends when the sender side of the channel closes.
    pub fn spawn_consumer(
        self: &Arc<Self>,
        resource: Arc<WatchedResource>,
        mut events: mpsc::Receiver<FsEvent>,
    ) -> JoinHandle<()> {
        let aggregator = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                aggregator.record(&resource, &event);
            }
            info!(resource = %resource.id(), "Change stream closed");
        })
    }
}
