//! Remote command relay
//!
//! The client has no inbound connection, so remote actors queue commands on
//! the server and the [`CommandRelay`] polls for them on a fixed interval.
//! Each tick:
//!
//! 1. `poll()` the command channel; a transport error is logged at debug
//!    level and the tick ends. A rejected credential also cancels the
//!    relay's rejection signal.
//! 2. Dispatch every returned command in order, one at a time.
//! 3. Report `(kind, success)` once per known command. A failed report is
//!    logged and dropped.
//!
//! Commands are consumed server-side when they are returned by `poll`, so a
//! crash while handling one loses it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use savesync_core::config::CompletionRetry;
use savesync_core::domain::{CommandKind, CredentialRejected, RemoteCommand};
use savesync_core::ports::ICommandChannel;

/// Executes remote commands on behalf of the relay
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Forced flush of every resource
    async fn handle_sync(&self) -> Result<()>;

    /// Restore of every resource from the remote store
    async fn handle_pull(&self) -> Result<()>;
}

/// Counts from a single poll tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub poll_failed: bool,
}

/// Polls for remote commands and dispatches them
pub struct CommandRelay {
    channel: Arc<dyn ICommandChannel>,
    handler: Arc<dyn CommandHandler>,
    interval: Duration,
    retry: CompletionRetry,
    credential_rejected: CancellationToken,
}

impl CommandRelay {
    pub fn new(
        channel: Arc<dyn ICommandChannel>,
        handler: Arc<dyn CommandHandler>,
        interval: Duration,
        retry: CompletionRetry,
    ) -> Self {
        Self {
            channel,
            handler,
            interval,
            retry,
            credential_rejected: CancellationToken::new(),
        }
    }

    /// Cancels `token` when a poll fails because the server rejected the
    /// credential
    pub fn with_rejection_signal(mut self, token: CancellationToken) -> Self {
        self.credential_rejected = token;
        self
    }

    /// Runs one poll-and-dispatch cycle
    pub async fn run_tick(&self) -> TickSummary {
        let mut summary = TickSummary::default();

        let commands = match self.channel.poll().await {
            Ok(commands) => commands,
            Err(e) => {
                debug!(error = %e, "Command poll failed");
                if CredentialRejected::in_chain(&e) && !self.credential_rejected.is_cancelled() {
                    warn!("Server rejected the credential while polling commands");
                    self.credential_rejected.cancel();
                }
                summary.poll_failed = true;
                return summary;
            }
        };

        summary.received = commands.len();
        if !commands.is_empty() {
            info!(count = commands.len(), "Received remote commands");
        }

        for command in commands {
            match self.dispatch(&command).await {
                Some(true) => summary.succeeded += 1,
                Some(false) => summary.failed += 1,
                None => summary.skipped += 1,
            }
        }
        summary
    }

    /// Handles one command and reports its outcome
    ///
    /// Returns `None` for commands this client does not understand; those
    /// get no completion report.
    async fn dispatch(&self, command: &RemoteCommand) -> Option<bool> {
        let result = match command.kind {
            CommandKind::Sync => {
                info!(command_id = command.id, "Handling remote sync");
                self.handler.handle_sync().await
            }
            CommandKind::Pull => {
                info!(command_id = command.id, "Handling remote pull");
                self.handler.handle_pull().await
            }
            CommandKind::Unknown => {
                warn!(command_id = command.id, "Ignoring unknown command type");
                return None;
            }
        };

        let success = match result {
            Ok(()) => true,
            Err(e) => {
                error!(command_id = command.id, kind = %command.kind, error = %e, "Command failed");
                false
            }
        };

        self.report(command.kind, success).await;
        Some(success)
    }

    async fn report(&self, kind: CommandKind, success: bool) {
        if let Err(e) = self.channel.report_completion(kind, success).await {
            match self.retry {
                CompletionRetry::None => {
                    warn!(kind = %kind, success, error = %e, "Failed to report completion");
                }
            }
        }
    }

    /// Spawns the poll loop; it stops when `token` is cancelled
    ///
    /// The first poll happens one interval after the call. With a zero
    /// interval the task never polls and only waits for cancellation.
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if self.interval.is_zero() {
                error!("Command poll interval is zero, relay disabled");
                token.cancelled().await;
                return;
            }

            info!(interval_secs = self.interval.as_secs(), "Command relay started");
            let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.run_tick().await;
                    }
                }
            }
            info!("Command relay stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use super::*;
    use crate::test_support::FakeCommandChannel;

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<&'static str>>,
        fail_pull: bool,
    }

    #[async_trait::async_trait]
    impl CommandHandler for RecordingHandler {
        async fn handle_sync(&self) -> Result<()> {
            self.calls.lock().unwrap().push("sync");
            Ok(())
        }

        async fn handle_pull(&self) -> Result<()> {
            self.calls.lock().unwrap().push("pull");
            if self.fail_pull {
                anyhow::bail!("download failed");
            }
            Ok(())
        }
    }

    fn relay(
        channel: Arc<FakeCommandChannel>,
        handler: Arc<RecordingHandler>,
        interval: Duration,
    ) -> CommandRelay {
        CommandRelay::new(channel, handler, interval, CompletionRetry::None)
    }

    #[tokio::test]
    async fn test_dispatches_in_order_and_reports_each() {
        let channel = FakeCommandChannel::new();
        channel.push_commands(&[CommandKind::Sync, CommandKind::Pull]);
        let handler = Arc::new(RecordingHandler::default());
        let relay = relay(channel.clone(), handler.clone(), Duration::from_secs(10));

        let summary = relay.run_tick().await;

        assert_eq!(summary.received, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(*handler.calls.lock().unwrap(), vec!["sync", "pull"]);
        assert_eq!(
            channel.reports(),
            vec![(CommandKind::Sync, true), (CommandKind::Pull, true)]
        );
    }

    #[tokio::test]
    async fn test_handler_error_reports_failure() {
        let channel = FakeCommandChannel::new();
        channel.push_commands(&[CommandKind::Pull]);
        let handler = Arc::new(RecordingHandler {
            fail_pull: true,
            ..Default::default()
        });
        let relay = relay(channel.clone(), handler, Duration::from_secs(10));

        let summary = relay.run_tick().await;
        assert_eq!(summary.failed, 1);
        assert_eq!(channel.reports(), vec![(CommandKind::Pull, false)]);
    }

    #[tokio::test]
    async fn test_unknown_command_is_skipped_without_report() {
        let channel = FakeCommandChannel::new();
        channel.push_commands(&[CommandKind::Unknown, CommandKind::Sync]);
        let handler = Arc::new(RecordingHandler::default());
        let relay = relay(channel.clone(), handler.clone(), Duration::from_secs(10));

        let summary = relay.run_tick().await;
        assert_eq!(summary.skipped, 1);
        assert_eq!(*handler.calls.lock().unwrap(), vec!["sync"]);
        assert_eq!(channel.reports(), vec![(CommandKind::Sync, true)]);
    }

    #[tokio::test]
    async fn test_report_failure_is_not_retried() {
        let channel = FakeCommandChannel::new();
        channel.fail_reports(true);
        channel.push_commands(&[CommandKind::Sync]);
        let handler = Arc::new(RecordingHandler::default());
        let relay = relay(channel.clone(), handler, Duration::from_secs(10));

        let summary = relay.run_tick().await;
        assert_eq!(summary.succeeded, 1);
        assert_eq!(channel.reports().len(), 1);

        relay.run_tick().await;
        assert_eq!(channel.reports().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_error_does_not_stop_next_tick() {
        let channel = FakeCommandChannel::new();
        channel.push_error("connection refused");
        channel.push_commands(&[CommandKind::Sync]);
        let handler = Arc::new(RecordingHandler::default());
        let relay = relay(channel.clone(), handler.clone(), Duration::from_secs(10));

        let first = relay.run_tick().await;
        assert!(first.poll_failed);
        assert!(channel.reports().is_empty());

        let second = relay.run_tick().await;
        assert!(!second.poll_failed);
        assert_eq!(channel.reports(), vec![(CommandKind::Sync, true)]);
    }

    #[tokio::test]
    async fn test_spawned_loop_polls_until_cancelled() {
        let channel = FakeCommandChannel::new();
        channel.push_error("timeout");
        channel.push_commands(&[CommandKind::Sync]);
        let handler = Arc::new(RecordingHandler::default());
        let relay = Arc::new(relay(channel.clone(), handler, Duration::from_millis(20)));

        let token = CancellationToken::new();
        let handle = relay.spawn(token.clone());

        let deadline = Instant::now() + Duration::from_secs(5);
        while channel.reports().is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(channel.reports(), vec![(CommandKind::Sync, true)]);

        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("relay should stop after cancellation")
            .unwrap();

        let polls = channel.polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(channel.polls.load(Ordering::SeqCst), polls);
    }

    #[tokio::test]
    async fn test_rejected_poll_cancels_signal() {
        let channel = FakeCommandChannel::new();
        channel.push_error("connection refused");
        channel.push_rejection();
        let token = CancellationToken::new();
        let relay = relay(
            channel.clone(),
            Arc::new(RecordingHandler::default()),
            Duration::from_secs(10),
        )
        .with_rejection_signal(token.clone());

        assert!(relay.run_tick().await.poll_failed);
        assert!(!token.is_cancelled());

        assert!(relay.run_tick().await.poll_failed);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_zero_interval_never_polls() {
        let channel = FakeCommandChannel::new();
        let relay = Arc::new(relay(
            channel.clone(),
            Arc::new(RecordingHandler::default()),
            Duration::ZERO,
        ));

        let token = CancellationToken::new();
        let handle = relay.spawn(token.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(channel.polls.load(Ordering::SeqCst), 0);

        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("relay should stop after cancellation")
            .unwrap();
    }
}
