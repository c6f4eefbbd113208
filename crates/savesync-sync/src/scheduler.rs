//! Sync scheduler - turns flush triggers into uploads
//!
//! The [`SyncScheduler`] owns one periodic timer per resource and a
//! single-flight guard per resource. Triggers come from three places:
//!
//! - **Periodic** timers, which only flush when the pending set is non-empty
//! - **Forced** flushes of one resource (CLI, initial sync)
//! - **Forced** flushes of every resource (remote `sync` command)
//!
//! ## State machine
//!
//! ```text
//! Idle ──trigger──→ InFlight ──upload finished (ok or error)──→ Idle
//!                      │
//!              trigger while InFlight: dropped
//! ```
//!
//! A flush takes the pending set when it starts, snapshots the live
//! directory listing and uploads all of it. Failures are logged and never
//! retried; the next trigger starts from scratch.
//!
//! Restores share the same guard, so a download never overwrites a
//! directory while its snapshot is being uploaded (and vice versa).
//!
//! A transfer that fails because the server rejected the credential cancels
//! the scheduler's rejection signal, see
//! [`with_rejection_signal`](SyncScheduler::with_rejection_signal).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use savesync_core::domain::{CredentialRejected, ResourceId, WatchedResource};
use savesync_core::ports::ITransferGateway;

use crate::aggregator::ChangeAggregator;
use crate::restore::RestoreService;
use crate::snapshot;
use crate::SyncError;

// ============================================================================
// FlushOutcome
// ============================================================================

/// What a single flush trigger did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The snapshot was uploaded
    Uploaded(usize),
    /// The snapshot had no files, nothing was uploaded
    Empty,
    /// Periodic trigger with an empty pending set
    NothingPending,
    /// Another flush of the same resource was running; trigger dropped
    AlreadyInFlight,
    /// Snapshot or upload failed
    Failed(String),
}

impl FlushOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FlushOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Periodic,
    Forced,
}

// ============================================================================
// Per-resource state
// ============================================================================

/// Point-in-time view of one resource, for logging and the CLI
#[derive(Debug, Clone)]
pub struct ResourceStatus {
    pub id: ResourceId,
    pub display_name: String,
    pub in_flight: bool,
    pub pending: usize,
    pub last_flush_at: Option<DateTime<Utc>>,
    pub last_uploaded: Option<usize>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct FlushRecord {
    last_flush_at: Option<DateTime<Utc>>,
    last_uploaded: Option<usize>,
    last_error: Option<String>,
}

struct ResourceSlot {
    resource: Arc<WatchedResource>,
    in_flight: AtomicBool,
    record: Mutex<FlushRecord>,
}

impl ResourceSlot {
    fn note(&self, outcome: &FlushOutcome) {
        let Ok(mut record) = self.record.lock() else {
            return;
        };
        match outcome {
            FlushOutcome::Uploaded(n) => {
                record.last_flush_at = Some(Utc::now());
                record.last_uploaded = Some(*n);
                record.last_error = None;
            }
            FlushOutcome::Empty => {
                record.last_flush_at = Some(Utc::now());
                record.last_uploaded = Some(0);
                record.last_error = None;
            }
            FlushOutcome::Failed(msg) => {
                record.last_flush_at = Some(Utc::now());
                record.last_error = Some(msg.clone());
            }
            FlushOutcome::NothingPending | FlushOutcome::AlreadyInFlight => {}
        }
    }
}

/// Holds a resource's in-flight flag; clears it on drop
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct TimerSet {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

// ============================================================================
// SyncScheduler
// ============================================================================

/// Per-resource flush timers and single-flight uploads
pub struct SyncScheduler {
    order: Vec<ResourceId>,
    slots: HashMap<ResourceId, Arc<ResourceSlot>>,
    aggregator: Arc<ChangeAggregator>,
    gateway: Arc<dyn ITransferGateway>,
    restorer: RestoreService,
    flush_interval: Duration,
    timers: Mutex<Option<TimerSet>>,
    credential_rejected: CancellationToken,
}

impl SyncScheduler {
    /// Creates a scheduler for `resources`
    ///
    /// Timers are not started until [`start`](Self::start) is called.
    pub fn new(
        resources: Vec<WatchedResource>,
        aggregator: Arc<ChangeAggregator>,
        gateway: Arc<dyn ITransferGateway>,
        flush_interval: Duration,
    ) -> Self {
        let mut order = Vec::with_capacity(resources.len());
        let mut slots = HashMap::with_capacity(resources.len());
        for resource in resources {
            let id = resource.id().clone();
            if slots.contains_key(&id) {
                warn!(resource = %id, "Duplicate resource id, keeping the first");
                continue;
            }
            order.push(id.clone());
            slots.insert(
                id,
                Arc::new(ResourceSlot {
                    resource: Arc::new(resource),
                    in_flight: AtomicBool::new(false),
                    record: Mutex::new(FlushRecord::default()),
                }),
            );
        }

        info!(
            resources = order.len(),
            flush_interval_secs = flush_interval.as_secs(),
            "Creating sync scheduler"
        );

        Self {
            order,
            slots,
            aggregator,
            restorer: RestoreService::new(Arc::clone(&gateway)),
            gateway,
            flush_interval,
            timers: Mutex::new(None),
            credential_rejected: CancellationToken::new(),
        }
    }

    /// Cancels `token` whenever a transfer fails because the server
    /// rejected the credential
    pub fn with_rejection_signal(mut self, token: CancellationToken) -> Self {
        self.credential_rejected = token;
        self
    }

    fn check_rejection(&self, id: &ResourceId, err: &anyhow::Error) {
        if CredentialRejected::in_chain(err) && !self.credential_rejected.is_cancelled() {
            warn!(resource = %id, "Server rejected the credential");
            self.credential_rejected.cancel();
        }
    }

    /// Resources in catalog order
    pub fn resources(&self) -> Vec<Arc<WatchedResource>> {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(id))
            .map(|slot| Arc::clone(&slot.resource))
            .collect()
    }

    pub fn resource(&self, id: &ResourceId) -> Option<Arc<WatchedResource>> {
        self.slots.get(id).map(|slot| Arc::clone(&slot.resource))
    }

    pub fn aggregator(&self) -> &Arc<ChangeAggregator> {
        &self.aggregator
    }

    // ========================================================================
    // Flushes
    // ========================================================================

    /// Flushes `id` if its pending set is non-empty
    pub async fn flush_periodic(&self, id: &ResourceId) -> FlushOutcome {
        self.flush(id, Trigger::Periodic).await
    }

    /// Flushes `id` regardless of its pending set
    pub async fn force_flush(&self, id: &ResourceId) -> FlushOutcome {
        self.flush(id, Trigger::Forced).await
    }

    /// Forces a flush of every resource, concurrently
    ///
    /// Returns one outcome per resource in catalog order.
    pub async fn force_flush_all(self: &Arc<Self>) -> Vec<(ResourceId, FlushOutcome)> {
        let handles: Vec<_> = self
            .order
            .iter()
            .map(|id| {
                let scheduler = Arc::clone(self);
                let task_id = id.clone();
                let handle = tokio::spawn(async move { scheduler.force_flush(&task_id).await });
                (id.clone(), handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let outcome = handle
                .await
                .unwrap_or_else(|e| FlushOutcome::Failed(format!("flush task failed: {e}")));
            outcomes.push((id, outcome));
        }
        outcomes
    }

    /// Forces one flush per resource that currently has at least one file
    pub async fn initial_sync(self: &Arc<Self>) -> Vec<(ResourceId, FlushOutcome)> {
        info!("Running initial sync");

        let handles: Vec<_> = self
            .order
            .iter()
            .filter_map(|id| self.slots.get(id))
            .map(|slot| {
                let scheduler = Arc::clone(self);
                let resource = Arc::clone(&slot.resource);
                tokio::spawn(async move {
                    let scanned = Arc::clone(&resource);
                    let has_files = tokio::task::spawn_blocking(move || snapshot::has_files(&scanned))
                        .await
                        .unwrap_or(false);
                    if !has_files {
                        debug!(resource = %resource.id(), "No files yet, skipping initial sync");
                        return None;
                    }
                    Some((resource.id().clone(), scheduler.force_flush(resource.id()).await))
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => error!(error = %e, "Initial sync task failed"),
            }
        }
        outcomes
    }

    async fn flush(&self, id: &ResourceId, trigger: Trigger) -> FlushOutcome {
        let Some(slot) = self.slots.get(id).cloned() else {
            warn!(resource = %id, "Flush requested for unknown resource");
            return FlushOutcome::Failed(SyncError::UnknownResource(id.to_string()).to_string());
        };

        let Some(_guard) = FlightGuard::acquire(&slot.in_flight) else {
            info!(resource = %id, trigger = ?trigger, "Flush already in flight, dropping trigger");
            return FlushOutcome::AlreadyInFlight;
        };

        let pending = self.aggregator.take(id);
        if trigger == Trigger::Periodic && pending.is_empty() {
            debug!(resource = %id, "No pending changes");
            return FlushOutcome::NothingPending;
        }

        debug!(resource = %id, trigger = ?trigger, pending = pending.len(), "Starting flush");
        let outcome = self.upload_snapshot(&slot.resource).await;
        slot.note(&outcome);
        outcome
    }

    async fn upload_snapshot(&self, resource: &WatchedResource) -> FlushOutcome {
        let id = resource.id();
        let files = match snapshot::take(resource).await {
            Ok(files) => files,
            Err(e) => {
                error!(resource = %id, error = %e, "Failed to snapshot resource");
                return FlushOutcome::Failed(format!("{e:#}"));
            }
        };

        if files.is_empty() {
            info!(resource = %id, "Snapshot is empty, nothing to upload");
            return FlushOutcome::Empty;
        }

        let count = files.len();
        match self.gateway.upload(id, files).await {
            Ok(()) => {
                info!(resource = %id, files = count, "Uploaded snapshot");
                FlushOutcome::Uploaded(count)
            }
            Err(e) => {
                error!(resource = %id, error = %e, "Upload failed");
                self.check_rejection(id, &e);
                FlushOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    // ========================================================================
    // Restores
    // ========================================================================

    /// Restores `id` from the remote store
    ///
    /// # Errors
    /// Fails with [`SyncError::ResourceBusy`] while a flush or another
    /// restore of `id` is running, and with the download or extraction
    /// error otherwise.
    pub async fn restore(&self, id: &ResourceId) -> anyhow::Result<usize> {
        let Some(slot) = self.slots.get(id).cloned() else {
            return Err(SyncError::UnknownResource(id.to_string()).into());
        };

        let Some(_guard) = FlightGuard::acquire(&slot.in_flight) else {
            warn!(resource = %id, "Transfer in flight, refusing restore");
            return Err(SyncError::ResourceBusy(id.to_string()).into());
        };

        let result = self.restorer.restore(&slot.resource).await;
        if let Err(e) = &result {
            self.check_rejection(id, e);
        }
        result
    }

    /// Restores every resource in catalog order, one at a time
    ///
    /// A failure is logged and does not stop the remaining resources.
    pub async fn restore_all(&self) -> Vec<(ResourceId, anyhow::Result<usize>)> {
        let mut results = Vec::with_capacity(self.order.len());
        for id in &self.order {
            let result = self.restore(id).await;
            if let Err(e) = &result {
                error!(resource = %id, error = %e, "Restore failed");
            }
            results.push((id.clone(), result));
        }
        results
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Starts one periodic timer per resource
    ///
    /// The first tick fires one full interval after start. Calling `start`
    /// twice restarts the timers. A zero interval starts no timers.
    pub fn start(self: &Arc<Self>) {
        self.stop();

        if self.flush_interval.is_zero() {
            error!("Flush interval is zero, periodic flushes disabled");
            return;
        }

        let token = CancellationToken::new();
        let handles = self
            .order
            .iter()
            .map(|id| {
                let scheduler = Arc::clone(self);
                let token = token.child_token();
                let id = id.clone();
                let period = self.flush_interval;
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = ticker.tick() => {
                                scheduler.flush_periodic(&id).await;
                            }
                        }
                    }
                    debug!(resource = %id, "Flush timer stopped");
                })
            })
            .collect();

        if let Ok(mut timers) = self.timers.lock() {
            *timers = Some(TimerSet { token, handles });
        }
        info!(resources = self.order.len(), "Flush timers started");
    }

    /// Cancels every periodic timer
    ///
    /// A flush running inside a timer task is abandoned.
    pub fn stop(&self) {
        let set = match self.timers.lock() {
            Ok(mut timers) => timers.take(),
            Err(_) => None,
        };
        if let Some(set) = set {
            set.token.cancel();
            for handle in set.handles {
                handle.abort();
            }
            info!("Flush timers stopped");
        }
    }

    pub fn timers_running(&self) -> bool {
        self.timers
            .lock()
            .map(|timers| timers.is_some())
            .unwrap_or(false)
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn status(&self, id: &ResourceId) -> Option<ResourceStatus> {
        let slot = self.slots.get(id)?;
        let (last_flush_at, last_uploaded, last_error) = match slot.record.lock() {
            Ok(record) => (
                record.last_flush_at,
                record.last_uploaded,
                record.last_error.clone(),
            ),
            Err(_) => (None, None, None),
        };
        Some(ResourceStatus {
            id: id.clone(),
            display_name: slot.resource.display_name().to_string(),
            in_flight: slot.in_flight.load(Ordering::Acquire),
            pending: self.aggregator.pending_count(id),
            last_flush_at,
            last_uploaded,
            last_error,
        })
    }

    pub fn statuses(&self) -> Vec<ResourceStatus> {
        self.order.iter().filter_map(|id| self.status(id)).collect()
    }
}

// ============================================================================
// Unit tests
// ============================================================================
