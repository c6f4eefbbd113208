//! Remote commands
//!
//! Commands are queued on the server by an external actor (for example a
//! chat bot) and picked up by the client's command relay. They carry no
//! local persistence: once returned by a poll they are dispatched and
//! discarded.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// What a remote command asks the client to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Force-flush every watched resource
    Sync,
    /// Download and restore every watched resource
    Pull,
    /// A command type this client does not understand
    #[serde(other)]
    Unknown,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Sync => "sync",
            CommandKind::Pull => "pull",
            CommandKind::Unknown => "unknown",
        }
    }
}

impl Display for CommandKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command returned by the remote poll endpoint
///
/// Every command applies to all watched resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommand {
    #[serde(default)]
    pub id: u64,
    #[serde(rename = "request_type")]
    pub kind: CommandKind,
}

impl RemoteCommand {
    pub fn new(id: u64, kind: CommandKind) -> Self {
        Self { id, kind }
    }
}
