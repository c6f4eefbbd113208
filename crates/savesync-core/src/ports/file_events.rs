//! Filesystem event source port
//!
//! The change aggregator never talks to the OS notification facility
//! directly. It subscribes through [`IFileEventSource`] and consumes a stream
//! of [`FsEvent`] values, which lets tests drive it with a plain channel.
//!
//! ## Design Notes
//!
//! - Subscriptions are RAII guards: dropping an [`EventSubscription`] stops
//!   delivery and releases the underlying OS watch.
//! - Renames are delivered as a removal of the old path and a creation of the
//!   new one; the aggregator only cares that both paths were touched.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

/// What happened to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsEventKind {
    Created,
    Modified,
    Removed,
}

/// A single filesystem notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub kind: FsEventKind,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FsEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FsEventKind::Created)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FsEventKind::Modified)
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FsEventKind::Removed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An active subscription to filesystem events
///
/// Events arrive on [`events`](EventSubscription::events). When the
/// subscription is dropped (or [`stop`](EventSubscription::stop) is called)
/// the stop callback runs exactly once.
pub struct EventSubscription {
    pub events: mpsc::Receiver<FsEvent>,
    stop_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl EventSubscription {
    /// Creates a subscription with a stop callback
    pub fn new(events: mpsc::Receiver<FsEvent>, stop_fn: impl FnOnce() + Send + 'static) -> Self {
        Self {
            events,
            stop_fn: Some(Box::new(stop_fn)),
        }
    }

    /// Creates a subscription that needs no cleanup (e.g. a test channel)
    pub fn from_receiver(events: mpsc::Receiver<FsEvent>) -> Self {
        Self {
            events,
            stop_fn: None,
        }
    }

    /// Splits the subscription into its receiver and a guard that keeps the
    /// underlying watch alive until dropped
    pub fn into_parts(mut self) -> (mpsc::Receiver<FsEvent>, SubscriptionGuard) {
        let stop_fn = self.stop_fn.take();
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        let events = std::mem::replace(&mut self.events, rx);
        (events, SubscriptionGuard { stop_fn })
    }

    /// Explicitly stops the subscription, consuming it
    pub fn stop(mut self) {
        if let Some(stop_fn) = self.stop_fn.take() {
            stop_fn();
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(stop_fn) = self.stop_fn.take() {
            stop_fn();
        }
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("active", &self.stop_fn.is_some())
            .finish()
    }
}

/// Keeps a watch alive after its receiver has been handed to a consumer task
pub struct SubscriptionGuard {
    stop_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionGuard {
    pub fn stop(mut self) {
        if let Some(stop_fn) = self.stop_fn.take() {
            stop_fn();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(stop_fn) = self.stop_fn.take() {
            stop_fn();
        }
    }
}

/// Port trait for filesystem change notifications
pub trait IFileEventSource: Send + Sync {
    /// Starts recursive notifications for every directory in `directories`
    ///
    /// # Errors
    /// Returns an error if no watch could be established at all. Individual
    /// directories that fail are the implementation's to log and skip.
    fn subscribe(&self, directories: &[PathBuf]) -> anyhow::Result<EventSubscription>;
}
