//! Account commands - link, logout and whoami
//!
//! - `link <code>` exchanges a 6-character code shown by the companion bot
//!   or web page for a session, and stores it in the session file.
//! - `logout` revokes the session remotely (best effort) and removes the
//!   session file.
//! - `whoami` verifies the stored session and prints the linked profile.

use anyhow::Result;
use clap::Args;
use tracing::info;

use savesync_core::domain::Profile;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct LinkCommand {
    /// Link code (6 characters)
    pub code: String,
}

impl LinkCommand {
    pub async fn execute(&self, context: &CliContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);

        let session = context.auth().link(&self.code).await?;
        info!(user = %session.profile.username, "Linked");

        if format == OutputFormat::Json {
            fmt.print_json(&profile_json(&session.profile));
        } else {
            fmt.success(&format!("Linked as {}", session.profile.username));
            fmt.info(&format!(
                "Session saved to {}",
                context.store.path().display()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct LogoutCommand {}

impl LogoutCommand {
    pub async fn execute(&self, context: &CliContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        context.auth().logout().await?;
        fmt.success("Logged out");
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct WhoamiCommand {}

impl WhoamiCommand {
    pub async fn execute(&self, context: &CliContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        let profile = context.authenticated().await?;

        if format == OutputFormat::Json {
            fmt.print_json(&profile_json(&profile));
        } else {
            fmt.success(&format!("Linked as {}", profile.username));
            fmt.info(&format!("Plan:   {}", profile.plan));
            fmt.info(&format!("Server: {}", context.client.base_url()));
        }
        Ok(())
    }
}

fn profile_json(profile: &Profile) -> serde_json::Value {
    serde_json::json!({
        "id": profile.id,
        "username": profile.username,
        "avatar": profile.avatar,
        "plan": profile.plan,
    })
}
