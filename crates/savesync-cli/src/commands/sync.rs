//! Sync command - one-shot forced flush of every resource
//!
//! Provides the `savesync sync` CLI command which:
//! 1. Restores the linked session
//! 2. Resolves the catalogs against this machine
//! 3. Uploads a full snapshot of every resource, concurrently
//!
//! No watcher or timer is started; the daemon does that.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Args;

use savesync_sync::aggregator::ChangeAggregator;
use savesync_sync::scheduler::{FlushOutcome, SyncScheduler};

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    pub async fn execute(&self, context: &CliContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        context.authenticated().await?;

        let (_, resources) = context.resources();
        if resources.is_empty() {
            bail!("No resource resolves on this machine");
        }

        fmt.info(&format!("Uploading {} resources...", resources.len()));
        let started = Instant::now();
        let scheduler = Arc::new(SyncScheduler::new(
            resources,
            Arc::new(ChangeAggregator::new()),
            context.client.clone(),
            context.config.flush_interval(),
        ));
        let results = scheduler.force_flush_all().await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let failed = results.iter().filter(|(_, o)| o.is_failure()).count();

        if format == OutputFormat::Json {
            let list: Vec<_> = results
                .iter()
                .map(|(id, outcome)| {
                    let error = match outcome {
                        FlushOutcome::Failed(e) => Some(e.as_str()),
                        _ => None,
                    };
                    serde_json::json!({
                        "resource": id.as_str(),
                        "outcome": outcome_label(outcome),
                        "files": uploaded_files(outcome),
                        "error": error,
                    })
                })
                .collect();
            fmt.print_json(&serde_json::json!({
                "results": list,
                "failed": failed,
                "duration_ms": duration_ms,
            }));
        } else {
            for (id, outcome) in &results {
                match outcome {
                    FlushOutcome::Uploaded(n) => fmt.info(&format!(
                        "{id}: uploaded {n} file{}",
                        if *n == 1 { "" } else { "s" }
                    )),
                    FlushOutcome::Failed(e) => fmt.error(&format!("{id}: {e}")),
                    other => fmt.info(&format!("{id}: {}", outcome_label(other))),
                }
            }
            if failed == 0 {
                fmt.success(&format!("Sync completed in {duration_ms}ms"));
            }
        }

        if failed > 0 {
            bail!("{failed} of {} resources failed to upload", results.len());
        }
        Ok(())
    }
}

fn outcome_label(outcome: &FlushOutcome) -> &'static str {
    match outcome {
        FlushOutcome::Uploaded(_) => "uploaded",
        FlushOutcome::Empty => "no files",
        FlushOutcome::NothingPending => "nothing pending",
        FlushOutcome::AlreadyInFlight => "already in flight",
        FlushOutcome::Failed(_) => "failed",
    }
}

fn uploaded_files(outcome: &FlushOutcome) -> usize {
    match outcome {
        FlushOutcome::Uploaded(n) => *n,
        _ => 0,
    }
}
