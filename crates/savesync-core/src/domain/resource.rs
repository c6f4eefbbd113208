//! Resource types
//!
//! A *resource* is one logical unit that is mirrored to the remote store,
//! typically the save folder of a single game or application. Resources are
//! declared in the catalog files ([`ResourceDefinition`]) and, once their
//! watch patterns have been resolved on this machine, become a
//! [`WatchedResource`] that is immutable for the rest of the process lifetime.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// ResourceId
// ============================================================================

/// Identifier of a resource (e.g. `"minecraft"`, `"chess"`)
///
/// The id is used verbatim as a remote path segment, so it must be non-empty
/// and may not contain path separators or be a relative path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a validated ResourceId
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidResourceId("id is empty".to_string()));
        }
        if id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(DomainError::InvalidResourceId(id));
        }
        Ok(Self(id))
    }

    /// Get the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

// ============================================================================
// Catalog declarations
// ============================================================================

/// Which catalog list a resource was declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Game,
    App,
}

impl Display for ResourceCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResourceCategory::Game => f.write_str("game"),
            ResourceCategory::App => f.write_str("app"),
        }
    }
}

/// A single watch pattern as written in the catalog
///
/// `pattern` may contain `%NAME%` environment placeholders and `*` / `?`
/// wildcards. `extensions` is the allow-list applied to files under every
/// directory the pattern resolves to (`".sav"` form; `""` matches files
/// without an extension; an empty list admits everything).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchPattern {
    pub pattern: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// A resource as declared in a catalog file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub watch_paths: Vec<WatchPattern>,
}

// ============================================================================
// Resolved resources
// ============================================================================

/// An existing directory that belongs to a resource, with its extension filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRoot {
    pub dir: PathBuf,
    pub extensions: Vec<String>,
}

impl WatchRoot {
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            extensions,
        }
    }
}

/// A resource whose watch patterns resolved to at least one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedResource {
    id: ResourceId,
    display_name: String,
    category: ResourceCategory,
    roots: Vec<WatchRoot>,
}

impl WatchedResource {
    /// Create a watched resource
    ///
    /// # Errors
    /// Returns [`DomainError::ValidationFailed`] if `roots` is empty; a
    /// resource with nothing to watch is excluded rather than constructed.
    pub fn new(
        id: ResourceId,
        display_name: impl Into<String>,
        category: ResourceCategory,
        roots: Vec<WatchRoot>,
    ) -> Result<Self, DomainError> {
        if roots.is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "resource {id} has no resolved directories"
            )));
        }
        Ok(Self {
            id,
            display_name: display_name.into(),
            category,
            roots,
        })
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn category(&self) -> ResourceCategory {
        self.category
    }

    pub fn roots(&self) -> &[WatchRoot] {
        &self.roots
    }

    /// Directory that restores are extracted into (the first resolved root)
    pub fn base_dir(&self) -> &Path {
        &self.roots[0].dir
    }

    /// All watched directories
    pub fn directories(&self) -> Vec<PathBuf> {
        self.roots.iter().map(|r| r.dir.clone()).collect()
    }

    /// Finds the root that contains `path`
    ///
    /// When roots are nested the deepest one wins, so its extension filter
    /// applies.
    pub fn root_for(&self, path: &Path) -> Option<&WatchRoot> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(&root.dir))
            .max_by_key(|root| root.dir.components().count())
    }
}
