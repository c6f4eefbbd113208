//! Command channel port
//!
//! The remote control plane queues commands for this client. The client has
//! no inbound connection, so it polls for them and reports completion.
//!
//! Delivery is at-most-once: the server marks commands delivered as soon as
//! a poll returns them. A client that crashes before finishing a command
//! loses it.

use crate::domain::{CommandKind, RemoteCommand};

/// Port trait for receiving remote commands
#[async_trait::async_trait]
pub trait ICommandChannel: Send + Sync {
    /// Fetches outstanding commands, oldest first
    async fn poll(&self) -> anyhow::Result<Vec<RemoteCommand>>;

    /// Tells the remote side a command finished
    ///
    /// Fire-and-forget: the response body carries no contract.
    async fn report_completion(&self, kind: CommandKind, success: bool) -> anyhow::Result<()>;
}
