//! SaveSync Sync - Change-driven synchronization engine
//!
//! Provides:
//! - Watch path resolution (`%NAME%` placeholders and wildcards)
//! - Filesystem change aggregation into per-resource pending sets
//! - Periodic and forced flushes with a single-flight guard per resource
//! - A polling relay for remote `sync` / `pull` commands
//!
//! ## Modules
//!
//! - [`resolver`] - Expands catalog patterns into watch roots
//! - [`filter`] - Noise and extension filters shared by watcher and snapshots
//! - [`watcher`] - `notify`-backed [`IFileEventSource`](savesync_core::ports::IFileEventSource)
//! - [`aggregator`] - Pending change sets
//! - [`snapshot`] - Live directory listing of a resource
//! - [`scheduler`] - Flush timers and single-flight uploads
//! - [`restore`] - Archive download and extraction
//! - [`relay`] - Remote command polling and dispatch
//! - [`engine`] - Wires everything together with start/shutdown

pub mod aggregator;
pub mod engine;
pub mod filter;
pub mod relay;
pub mod resolver;
pub mod restore;
pub mod scheduler;
pub mod snapshot;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// None of the configured resources resolved to a watchable directory
    #[error("No resource can be watched")]
    NothingToWatch,

    /// The downloaded archive could not be read
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    /// An archive entry would be written outside the base directory
    #[error("Archive entry escapes base directory: {0}")]
    PathEscapesBase(String),

    /// The resource is not known to the engine
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// A transfer of the resource is already running
    #[error("Transfer already in flight for {0}")]
    ResourceBusy(String),

    /// A timer period was zero
    #[error("Invalid interval: {0} must be greater than zero")]
    InvalidInterval(&'static str),
}

impl From<zip::result::ZipError> for SyncError {
    fn from(err: zip::result::ZipError) -> Self {
        SyncError::InvalidArchive(err.to_string())
    }
}
