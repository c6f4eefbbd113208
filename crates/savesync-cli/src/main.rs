//! SaveSync CLI - Command-line interface for SaveSync
//!
//! Provides commands for:
//! - Linking this machine to an account
//! - Inspecting which resources resolve locally
//! - One-shot upload and restore
//! - Listing and deleting remote saves

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    account::{LinkCommand, LogoutCommand, WhoamiCommand},
    pull::PullCommand,
    resources::ResourcesCommand,
    saves::{ForgetCommand, SavesCommand},
    sync::SyncCommand,
};
use context::CliContext;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "savesync", version, about = "Sync game saves and app data across machines")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Link this machine with a code from your account
    Link(LinkCommand),
    /// Forget the stored session
    Logout(LogoutCommand),
    /// Show the linked account
    Whoami(WhoamiCommand),
    /// Show which resources resolve on this machine
    Resources(ResourcesCommand),
    /// Upload every resource now
    Sync(SyncCommand),
    /// Restore every resource from the server
    Pull(PullCommand),
    /// List files stored on the server
    Saves(SavesCommand),
    /// Delete a resource's files from the server
    Forget(ForgetCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let result = run(&cli, format).await;
    if let Err(e) = &result {
        get_formatter(cli.json).error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: &Cli, format: OutputFormat) -> Result<()> {
    let context = CliContext::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Link(cmd) => cmd.execute(&context, format).await,
        Commands::Logout(cmd) => cmd.execute(&context, format).await,
        Commands::Whoami(cmd) => cmd.execute(&context, format).await,
        Commands::Resources(cmd) => cmd.execute(&context, format).await,
        Commands::Sync(cmd) => cmd.execute(&context, format).await,
        Commands::Pull(cmd) => cmd.execute(&context, format).await,
        Commands::Saves(cmd) => cmd.execute(&context, format).await,
        Commands::Forget(cmd) => cmd.execute(&context, format).await,
    }
}
