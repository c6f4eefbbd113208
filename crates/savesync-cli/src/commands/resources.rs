//! Resources command - show what the catalogs resolve to on this machine

use anyhow::Result;
use clap::Args;

use savesync_core::domain::WatchedResource;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ResourcesCommand {
    /// Also list enabled entries with no matching directory
    #[arg(long)]
    pub all: bool,
}

impl ResourcesCommand {
    pub async fn execute(&self, context: &CliContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        let (catalog, resources) = context.resources();

        let unresolved: Vec<_> = catalog
            .enabled()
            .filter(|entry| !resources.iter().any(|r| r.id() == &entry.definition.id))
            .map(|entry| entry.definition.id.to_string())
            .collect();

        if format == OutputFormat::Json {
            let list: Vec<_> = resources.iter().map(resource_json).collect();
            fmt.print_json(&serde_json::json!({
                "resources": list,
                "unresolved": unresolved,
            }));
            return Ok(());
        }

        if resources.is_empty() {
            fmt.warn("No resource resolves on this machine");
        } else {
            fmt.success(&format!(
                "{} of {} catalog entries resolve on this machine",
                resources.len(),
                catalog.len()
            ));
        }

        for resource in &resources {
            fmt.info(&format!(
                "{} ({}, {})",
                resource.display_name(),
                resource.id(),
                resource.category()
            ));
            for root in resource.roots() {
                let filter = if root.extensions.is_empty() {
                    "all files".to_string()
                } else {
                    root.extensions.join(" ")
                };
                fmt.info(&format!("    {}  [{}]", root.dir.display(), filter));
            }
        }

        if self.all && !unresolved.is_empty() {
            fmt.info(&format!("Not found here: {}", unresolved.join(", ")));
        }
        Ok(())
    }
}

fn resource_json(resource: &WatchedResource) -> serde_json::Value {
    let roots: Vec<_> = resource
        .roots()
        .iter()
        .map(|root| {
            serde_json::json!({
                "dir": root.dir.display().to_string(),
                "extensions": root.extensions,
            })
        })
        .collect();

    serde_json::json!({
        "id": resource.id().as_str(),
        "name": resource.display_name(),
        "category": resource.category().to_string(),
        "roots": roots,
    })
}
