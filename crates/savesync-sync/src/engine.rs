//! Synchronization engine
//!
//! The [`SyncEngine`] wires the pieces of this crate together for the
//! lifetime of the daemon.
//!
//! ## Startup
//!
//! 1. Subscribe to filesystem notifications for each resource and feed them
//!    into the [`ChangeAggregator`]
//! 2. Run the initial sync (one forced flush per resource with files)
//! 3. Start the per-resource flush timers
//! 4. Start the remote command relay
//!
//! ## Shutdown
//!
//! Notifications stop first, then the timers, then the relay. Transfers
//! still in flight are abandoned.
//!
//! ## Rejected credentials
//!
//! When the server answers an upload, download or poll with 401 the engine
//! cancels [`SyncEngine::credential_rejected`]. The engine keeps running;
//! the owner decides whether to shut it down and re-link.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use savesync_core::config::{CompletionRetry, Config};
use savesync_core::domain::WatchedResource;
use savesync_core::ports::{
    ICommandChannel, IFileEventSource, ITransferGateway, SubscriptionGuard,
};

use crate::aggregator::ChangeAggregator;
use crate::relay::{CommandHandler, CommandRelay};
use crate::scheduler::{FlushOutcome, ResourceStatus, SyncScheduler};
use crate::SyncError;

// ============================================================================
// Settings and ports
// ============================================================================

/// Timing knobs for the engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub flush_interval: Duration,
    pub command_poll_interval: Duration,
    pub retry_completion: CompletionRetry,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            flush_interval: config.flush_interval(),
            command_poll_interval: config.command_poll_interval(),
            retry_completion: config.sync.retry_completion,
        }
    }
}

impl EngineSettings {
    /// Rejects zero timer periods
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.flush_interval.is_zero() {
            return Err(SyncError::InvalidInterval("flush interval"));
        }
        if self.command_poll_interval.is_zero() {
            return Err(SyncError::InvalidInterval("command poll interval"));
        }
        Ok(())
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Adapters the engine talks to
#[derive(Clone)]
pub struct EnginePorts {
    pub gateway: Arc<dyn ITransferGateway>,
    pub commands: Arc<dyn ICommandChannel>,
    pub events: Arc<dyn IFileEventSource>,
}

// ============================================================================
// Remote command handling
// ============================================================================

struct EngineCommands {
    scheduler: Arc<SyncScheduler>,
}

#[async_trait::async_trait]
impl CommandHandler for EngineCommands {
    async fn handle_sync(&self) -> Result<()> {
        let outcomes = self.scheduler.force_flush_all().await;
        let failed: Vec<_> = outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(id, _)| id.to_string())
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "{} of {} resources failed to sync: {}",
                failed.len(),
                outcomes.len(),
                failed.join(", ")
            )
        }
    }

    async fn handle_pull(&self) -> Result<()> {
        let results = self.scheduler.restore_all().await;
        let failed: Vec<_> = results
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(id, _)| id.to_string())
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "{} of {} resources failed to restore: {}",
                failed.len(),
                results.len(),
                failed.join(", ")
            )
        }
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Running synchronization engine
pub struct SyncEngine {
    scheduler: Arc<SyncScheduler>,
    subscriptions: Vec<SubscriptionGuard>,
    consumers: Vec<JoinHandle<()>>,
    relay_token: CancellationToken,
    relay_handle: Option<JoinHandle<()>>,
    credential_rejected: CancellationToken,
}

impl SyncEngine {
    /// Starts watching, runs the initial sync and starts timers and relay
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidInterval`] for a zero timer period and
    /// [`SyncError::NothingToWatch`] if `resources` is empty or no resource
    /// could be subscribed to.
    pub async fn start(
        resources: Vec<WatchedResource>,
        ports: EnginePorts,
        settings: EngineSettings,
    ) -> Result<Self, SyncError> {
        settings.validate()?;
        if resources.is_empty() {
            return Err(SyncError::NothingToWatch);
        }

        let credential_rejected = CancellationToken::new();
        let aggregator = Arc::new(ChangeAggregator::new());
        let scheduler = Arc::new(
            SyncScheduler::new(
                resources,
                Arc::clone(&aggregator),
                Arc::clone(&ports.gateway),
                settings.flush_interval,
            )
            .with_rejection_signal(credential_rejected.clone()),
        );

        // (1) filesystem notifications
        let mut subscriptions = Vec::new();
        let mut consumers = Vec::new();
        for resource in scheduler.resources() {
            match ports.events.subscribe(&resource.directories()) {
                Ok(subscription) => {
                    let (events, guard) = subscription.into_parts();
                    consumers.push(aggregator.spawn_consumer(Arc::clone(&resource), events));
                    subscriptions.push(guard);
                }
                Err(e) => {
                    warn!(resource = %resource.id(), error = %e, "Failed to watch resource");
                }
            }
        }
        if subscriptions.is_empty() {
            error!("No resource could be watched");
            return Err(SyncError::NothingToWatch);
        }

        // (2) initial sync
        let outcomes = scheduler.initial_sync().await;
        let uploaded = outcomes
            .iter()
            .filter(|(_, o)| matches!(o, FlushOutcome::Uploaded(_)))
            .count();
        info!(resources = outcomes.len(), uploaded, "Initial sync finished");

        // (3) timers
        scheduler.start();

        // (4) relay
        let relay = Arc::new(
            CommandRelay::new(
                Arc::clone(&ports.commands),
                Arc::new(EngineCommands {
                    scheduler: Arc::clone(&scheduler),
                }),
                settings.command_poll_interval,
                settings.retry_completion,
            )
            .with_rejection_signal(credential_rejected.clone()),
        );
        let relay_token = CancellationToken::new();
        let relay_handle = relay.spawn(relay_token.clone());

        info!(
            resources = scheduler.resources().len(),
            watched = subscriptions.len(),
            "Sync engine started"
        );

        Ok(Self {
            scheduler,
            subscriptions,
            consumers,
            relay_token,
            relay_handle: Some(relay_handle),
            credential_rejected,
        })
    }

    /// Cancelled once the server rejects the engine's credential
    pub fn credential_rejected(&self) -> CancellationToken {
        self.credential_rejected.clone()
    }

    pub fn scheduler(&self) -> &Arc<SyncScheduler> {
        &self.scheduler
    }

    pub fn statuses(&self) -> Vec<ResourceStatus> {
        self.scheduler.statuses()
    }

    fn halt(&mut self) {
        for guard in self.subscriptions.drain(..) {
            guard.stop();
        }
        for consumer in self.consumers.drain(..) {
            consumer.abort();
        }

        self.scheduler.stop();

        self.relay_token.cancel();
        if let Some(handle) = &self.relay_handle {
            handle.abort();
        }
    }

    /// Stops notifications, timers and the relay, in that order
    pub async fn shutdown(mut self) {
        info!("Shutting down sync engine");
        self.halt();
        if let Some(handle) = self.relay_handle.take() {
            let _ = handle.await;
        }
        info!("Sync engine stopped");
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::Ordering;

    use savesync_core::domain::CommandKind;
    use savesync_core::ports::FsEvent;
    use tokio::time::Instant;

    use super::*;
    use crate::test_support::{
        build_archive, resource_in, FailingEventSource, FakeCommandChannel, FakeEventSource,
        FakeGateway,
    };

    fn settings() -> EngineSettings {
        EngineSettings {
            flush_interval: Duration::from_secs(300),
            command_poll_interval: Duration::from_millis(20),
            retry_completion: CompletionRetry::None,
        }
    }

    async fn wait_for_reports(channel: &FakeCommandChannel, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while channel.reports().len() < count && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_start_without_resources_fails() {
        let ports = EnginePorts {
            gateway: FakeGateway::new(),
            commands: FakeCommandChannel::new(),
            events: FakeEventSource::new(),
        };
        let result = SyncEngine::start(vec![], ports, settings()).await;
        assert!(matches!(result, Err(SyncError::NothingToWatch)));
    }

    #[tokio::test]
    async fn test_chess_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("chess");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("state.json"), b"{\"move\":1}").unwrap();

        let gateway = FakeGateway::new();
        let channel = FakeCommandChannel::new();
        let events = FakeEventSource::new();
        let ports = EnginePorts {
            gateway: gateway.clone(),
            commands: channel.clone(),
            events: events.clone(),
        };

        let engine = SyncEngine::start(
            vec![resource_in("chess", &base, &[".json"])],
            ports,
            settings(),
        )
        .await
        .unwrap();

        // Initial forced flush uploaded state.json
        let uploads = gateway.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0.as_str(), "chess");
        assert_eq!(uploads[0].1[0].relative_path, "state.json");
        assert_eq!(uploads[0].1[0].bytes, b"{\"move\":1}");

        // Remote pull overwrites it from the archive
        gateway.set_archive("chess", build_archive(&[("state.json", b"{\"move\":2}")]));
        channel.push_commands(&[CommandKind::Pull]);
        wait_for_reports(&channel, 1).await;

        assert_eq!(channel.reports(), vec![(CommandKind::Pull, true)]);
        assert_eq!(fs::read(base.join("state.json")).unwrap(), b"{\"move\":2}");

        engine.shutdown().await;
        assert_eq!(events.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_file_events_reach_pending_set() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = FakeGateway::new();
        let events = FakeEventSource::new();
        let ports = EnginePorts {
            gateway: gateway.clone(),
            commands: FakeCommandChannel::new(),
            events: events.clone(),
        };

        let engine = SyncEngine::start(
            vec![resource_in("game", dir.path(), &[".sav"])],
            ports,
            settings(),
        )
        .await
        .unwrap();
        assert_eq!(events.subscriptions(), 1);
        // Nothing on disk yet, so the initial sync did not upload
        assert_eq!(gateway.attempts.load(Ordering::SeqCst), 0);

        let tx = events.sender_for(dir.path()).unwrap();
        tx.send(FsEvent::created(dir.path().join("slot.sav")))
            .await
            .unwrap();
        tx.send(FsEvent::created(dir.path().join(".DS_Store")))
            .await
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.statuses()[0].pending == 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(engine.statuses()[0].pending, 1);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_remote_sync_reports_failure_when_upload_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.sav"), b"a").unwrap();

        let gateway = FakeGateway::new();
        let channel = FakeCommandChannel::new();
        let ports = EnginePorts {
            gateway: gateway.clone(),
            commands: channel.clone(),
            events: FakeEventSource::new(),
        };
        let engine = SyncEngine::start(
            vec![resource_in("game", dir.path(), &[])],
            ports,
            settings(),
        )
        .await
        .unwrap();

        gateway.fail_uploads(true);
        channel.push_commands(&[CommandKind::Sync]);
        wait_for_reports(&channel, 1).await;
        assert_eq!(channel.reports(), vec![(CommandKind::Sync, false)]);

        gateway.fail_uploads(false);
        channel.push_commands(&[CommandKind::Sync]);
        wait_for_reports(&channel, 2).await;
        assert_eq!(channel.reports()[1], (CommandKind::Sync, true));

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_timers_and_relay() {
        let dir = tempfile::tempdir().unwrap();
        let channel = FakeCommandChannel::new();
        let ports = EnginePorts {
            gateway: FakeGateway::new(),
            commands: channel.clone(),
            events: FakeEventSource::new(),
        };
        let engine = SyncEngine::start(
            vec![resource_in("game", dir.path(), &[])],
            ports,
            settings(),
        )
        .await
        .unwrap();
        let scheduler = Arc::clone(engine.scheduler());
        assert!(scheduler.timers_running());

        engine.shutdown().await;
        assert!(!scheduler.timers_running());

        let polls = channel.polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(channel.polls.load(Ordering::SeqCst), polls);
    }

    #[tokio::test]
    async fn test_start_fails_when_no_subscription_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.sav"), b"a").unwrap();
        let gateway = FakeGateway::new();
        let ports = EnginePorts {
            gateway: gateway.clone(),
            commands: FakeCommandChannel::new(),
            events: Arc::new(FailingEventSource),
        };

        let result = SyncEngine::start(
            vec![resource_in("game", dir.path(), &[])],
            ports,
            settings(),
        )
        .await;
        assert!(matches!(result, Err(SyncError::NothingToWatch)));
        // Nothing was uploaded for an unwatched resource
        assert_eq!(gateway.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_rejects_zero_intervals() {
        let dir = tempfile::tempdir().unwrap();
        for settings in [
            EngineSettings {
                flush_interval: Duration::ZERO,
                ..settings()
            },
            EngineSettings {
                command_poll_interval: Duration::ZERO,
                ..settings()
            },
        ] {
            let ports = EnginePorts {
                gateway: FakeGateway::new(),
                commands: FakeCommandChannel::new(),
                events: FakeEventSource::new(),
            };
            let result = SyncEngine::start(
                vec![resource_in("game", dir.path(), &[])],
                ports,
                settings,
            )
            .await;
            assert!(matches!(result, Err(SyncError::InvalidInterval(_))));
        }
    }

    #[tokio::test]
    async fn test_remote_pull_refused_while_upload_in_flight() {
        let dir = tempfile::tempdir().unwrap();

        let gateway = FakeGateway::new();
        let channel = FakeCommandChannel::new();
        let ports = EnginePorts {
            gateway: gateway.clone(),
            commands: channel.clone(),
            events: FakeEventSource::new(),
        };
        let engine = SyncEngine::start(
            vec![resource_in("chess", dir.path(), &[])],
            ports,
            settings(),
        )
        .await
        .unwrap();
        let id = engine.scheduler().resources()[0].id().clone();
        // Written after start so the initial sync had nothing to upload
        fs::write(dir.path().join("state.json"), b"local").unwrap();

        gateway.set_archive("chess", build_archive(&[("state.json", b"remote")]));
        gateway.gate_uploads();
        let started = gateway.upload_started.notified();
        let upload = {
            let scheduler = Arc::clone(engine.scheduler());
            tokio::spawn(async move { scheduler.force_flush(&id).await })
        };
        tokio::time::timeout(Duration::from_secs(5), started)
            .await
            .unwrap();

        channel.push_commands(&[CommandKind::Pull]);
        wait_for_reports(&channel, 1).await;
        assert_eq!(channel.reports(), vec![(CommandKind::Pull, false)]);
        assert_eq!(gateway.downloads.load(Ordering::SeqCst), 0);
        assert_eq!(fs::read(dir.path().join("state.json")).unwrap(), b"local");

        gateway.release_one();
        assert_eq!(upload.await.unwrap(), FlushOutcome::Uploaded(1));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_rejected_upload_signals_credential_rejection() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.sav"), b"a").unwrap();

        let gateway = FakeGateway::new();
        gateway.reject_credential(true);
        let ports = EnginePorts {
            gateway: gateway.clone(),
            commands: FakeCommandChannel::new(),
            events: FakeEventSource::new(),
        };
        let engine = SyncEngine::start(
            vec![resource_in("game", dir.path(), &[])],
            ports,
            settings(),
        )
        .await
        .unwrap();

        // The initial sync hit the 401
        tokio::time::timeout(Duration::from_secs(5), engine.credential_rejected().cancelled())
            .await
            .expect("rejection should be signalled");
        engine.shutdown().await;
    }
}
