//! Watch path resolution
//!
//! Turns the catalog's watch patterns into existing directories on this
//! machine. A pattern goes through three steps:
//!
//! 1. `%NAME%` placeholders are replaced with the environment variable's
//!    value (unset variables expand to nothing).
//! 2. The result is normalised lexically (`.` and `..` collapsed).
//! 3. Patterns containing `*` or `?` are glob-expanded and only directory
//!    matches kept; other patterns are kept if the path is an existing
//!    directory.
//!
//! Failures never propagate: a bad pattern is logged and skipped, and a
//! resource with no resolved directory is left out.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use savesync_core::catalog::{Catalog, CatalogEntry};
use savesync_core::domain::{WatchPattern, WatchRoot, WatchedResource};

/// Replaces every `%NAME%` in `pattern` using `lookup`
///
/// A lone `%` without a closing partner is kept literally.
pub fn expand_placeholders<F>(pattern: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(start) = rest.find('%') {
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(len) if len > 0 => {
                out.push_str(&rest[..start]);
                let name = &after[..len];
                out.push_str(&lookup(name).unwrap_or_default());
                rest = &after[len + 1..];
            }
            _ => {
                out.push_str(&rest[..=start]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Collapses `.` and `..` without touching the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

fn has_wildcards(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Resolves one expanded pattern into existing directories
///
/// # Errors
/// Returns an error only for a syntactically invalid glob.
pub fn resolve_pattern(expanded: &str) -> anyhow::Result<Vec<PathBuf>> {
    let normalized = normalize(Path::new(expanded));

    if !has_wildcards(expanded) {
        return Ok(if normalized.is_dir() {
            vec![normalized]
        } else {
            debug!(path = %normalized.display(), "Watch path is not a directory");
            Vec::new()
        });
    }

    let mut dirs = Vec::new();
    for entry in glob::glob(&normalized.to_string_lossy())? {
        match entry {
            Ok(path) if path.is_dir() => dirs.push(path),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Unreadable glob match"),
        }
    }
    Ok(dirs)
}

/// Resolves every pattern of a resource into watch roots
///
/// Duplicate directories keep the first pattern's extension list.
pub fn resolve_roots<F>(patterns: &[WatchPattern], lookup: F) -> Vec<WatchRoot>
where
    F: Fn(&str) -> Option<String>,
{
    let mut seen = HashSet::new();
    let mut roots = Vec::new();

    for pattern in patterns {
        let expanded = expand_placeholders(&pattern.pattern, &lookup);
        match resolve_pattern(&expanded) {
            Ok(dirs) => {
                for dir in dirs {
                    if seen.insert(dir.clone()) {
                        roots.push(WatchRoot::new(dir, pattern.extensions.clone()));
                    }
                }
            }
            Err(e) => {
                warn!(pattern = %pattern.pattern, error = %e, "Failed to resolve watch pattern");
            }
        }
    }
    roots
}

fn resolve_entry<F>(entry: &CatalogEntry, lookup: F) -> Option<WatchedResource>
where
    F: Fn(&str) -> Option<String>,
{
    let def = &entry.definition;
    let roots = resolve_roots(&def.watch_paths, lookup);
    if roots.is_empty() {
        debug!(resource = %def.id, "No watch paths found on this machine");
        return None;
    }

    match WatchedResource::new(def.id.clone(), def.name.clone(), entry.category, roots) {
        Ok(resource) => Some(resource),
        Err(e) => {
            warn!(resource = %def.id, error = %e, "Skipping resource");
            None
        }
    }
}

/// Resolves every enabled catalog entry using the process environment
pub fn resolve_catalog(catalog: &Catalog) -> Vec<WatchedResource> {
    resolve_catalog_with(catalog, |name| std::env::var(name).ok())
}

/// Resolves every enabled catalog entry with a custom variable lookup
pub fn resolve_catalog_with<F>(catalog: &Catalog, lookup: F) -> Vec<WatchedResource>
where
    F: Fn(&str) -> Option<String>,
{
    let resources: Vec<_> = catalog
        .enabled()
        .filter_map(|entry| resolve_entry(entry, &lookup))
        .collect();

    for resource in &resources {
        info!(
            resource = %resource.id(),
            name = resource.display_name(),
            roots = resource.roots().len(),
            "Resolved resource"
        );
    }
    resources
}
