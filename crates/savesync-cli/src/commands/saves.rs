//! Remote save commands - list and delete what the server stores

use anyhow::{Context, Result};
use clap::Args;

use savesync_core::domain::ResourceId;
use savesync_core::ports::ITransferGateway;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SavesCommand {
    /// Only list files of this resource
    pub resource: Option<String>,
}

impl SavesCommand {
    pub async fn execute(&self, context: &CliContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        context.authenticated().await?;

        let filter = self
            .resource
            .as_deref()
            .map(ResourceId::new)
            .transpose()
            .context("Invalid resource id")?;
        let saves = context.client.list_saves(filter.as_ref()).await?;

        if format == OutputFormat::Json {
            let list: Vec<_> = saves
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "key": s.key,
                        "resource": s.game_id,
                        "file": s.file_name,
                    })
                })
                .collect();
            fmt.print_json(&serde_json::json!({ "saves": list }));
            return Ok(());
        }

        if saves.is_empty() {
            fmt.warn("No remote files");
            return Ok(());
        }
        fmt.success(&format!("{} remote files", saves.len()));
        for save in &saves {
            fmt.info(&format!("{}  {}", save.game_id, save.file_name));
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct ForgetCommand {
    /// Resource whose remote files are deleted
    pub resource: String,
}

impl ForgetCommand {
    pub async fn execute(&self, context: &CliContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        context.authenticated().await?;

        let id = ResourceId::new(&self.resource).context("Invalid resource id")?;
        context.client.delete(&id).await?;
        fmt.success(&format!("Deleted remote files of {id}"));
        Ok(())
    }
}
