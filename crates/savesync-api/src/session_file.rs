//! JSON file session store
//!
//! Stores the bearer credential as `{"credential": "..."}`. Files written by
//! older clients use the key `sessionId` and are still accepted.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use savesync_core::domain::Credential;
use savesync_core::ports::ISessionStore;

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    #[serde(alias = "sessionId")]
    credential: String,
}

/// Credential cache backed by a single JSON file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ISessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Credential>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read session file: {}", self.path.display())
                })
            }
        };

        let file: SessionFile = serde_json::from_str(&content)
            .with_context(|| format!("Malformed session file: {}", self.path.display()))?;
        if file.credential.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Credential::new(file.credential)?))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }

        let file = SessionFile {
            credential: credential.as_str().to_string(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Saved session");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Cleared session");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove session file: {}", self.path.display())
            }),
        }
    }
}
