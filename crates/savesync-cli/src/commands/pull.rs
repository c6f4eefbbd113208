//! Pull command - one-shot restore of every resource
//!
//! Downloads each resource's archive and extracts it over the resource's
//! first watch root, overwriting local files. Resources that fail are
//! reported and the rest are still restored. Restores go through the same
//! single-flight guard as uploads.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;

use savesync_sync::aggregator::ChangeAggregator;
use savesync_sync::scheduler::SyncScheduler;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct PullCommand {
    /// Only restore this resource
    #[arg(long)]
    pub only: Option<String>,
}

impl PullCommand {
    pub async fn execute(&self, context: &CliContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        context.authenticated().await?;

        let (_, resources) = context.resources();
        let resources: Vec<_> = resources
            .into_iter()
            .filter(|r| self.only.as_deref().map_or(true, |id| r.id().as_str() == id))
            .collect();
        if resources.is_empty() {
            bail!("No matching resource resolves on this machine");
        }

        let scheduler = SyncScheduler::new(
            resources,
            Arc::new(ChangeAggregator::new()),
            context.client.clone(),
            context.config.flush_interval(),
        );
        let results = scheduler.restore_all().await;
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();

        if format == OutputFormat::Json {
            let list: Vec<_> = results
                .iter()
                .map(|(id, result)| match result {
                    Ok(files) => serde_json::json!({ "resource": id.as_str(), "files": files }),
                    Err(e) => serde_json::json!({
                        "resource": id.as_str(),
                        "error": format!("{e:#}"),
                    }),
                })
                .collect();
            fmt.print_json(&serde_json::json!({ "results": list, "failed": failed }));
        } else {
            for (id, result) in &results {
                match result {
                    Ok(files) => fmt.info(&format!("{id}: restored {files} files")),
                    Err(e) => fmt.error(&format!("{id}: {e:#}")),
                }
            }
            if failed == 0 {
                fmt.success("Restore completed");
            }
        }

        if failed > 0 {
            bail!("{failed} of {} resources failed to restore", results.len());
        }
        Ok(())
    }
}
