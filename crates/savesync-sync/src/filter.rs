//! Path filters
//!
//! The same two filters decide both which events enter a pending set and
//! which files end up in a snapshot:
//!
//! 1. [`is_noise`] drops hidden entries and editor/temp files.
//! 2. [`matches_extensions`] applies a root's extension allow-list.

use std::path::{Component, Path};

use savesync_core::domain::WatchRoot;

const NOISE_SUFFIXES: &[&str] = &[".tmp", ".temp"];

/// Returns true if any segment of `relative` starts with a dot, or the path
/// ends in `.tmp` / `.temp`
pub fn is_noise(relative: &Path) -> bool {
    let hidden = relative.components().any(|c| match c {
        Component::Normal(segment) => segment.to_string_lossy().starts_with('.'),
        _ => false,
    });
    if hidden {
        return true;
    }

    let name = relative.to_string_lossy();
    NOISE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Checks `path` against an extension allow-list
///
/// Entries are in `.sav` form. The empty string matches a file with no
/// extension, and an empty list admits every path.
pub fn matches_extensions(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }

    let ext = match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => String::new(),
    };
    extensions.iter().any(|allowed| *allowed == ext)
}

/// Applies both filters to `path`, which must lie under `root`
///
/// Returns the path relative to the root when it passes. The root itself is
/// never admitted.
pub fn admit<'a>(root: &WatchRoot, path: &'a Path) -> Option<&'a Path> {
    let relative = path.strip_prefix(&root.dir).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    if is_noise(relative) || !matches_extensions(relative, &root.extensions) {
        return None;
    }
    Some(relative)
}
