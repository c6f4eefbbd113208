//! Resource catalogs
//!
//! Resources are declared in two JSON files, one listing games
//! (`{ "games": [...] }`) and one listing applications (`{ "apps": [...] }`).
//! Both are read once at startup. Callers treat a missing or malformed file
//! as an empty list after logging the error.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{error, info};

use crate::config::CatalogConfig;
use crate::domain::{ResourceCategory, ResourceDefinition};

#[derive(Debug, Deserialize)]
struct GamesFile {
    #[serde(default)]
    games: Vec<ResourceDefinition>,
}

#[derive(Debug, Deserialize)]
struct AppsFile {
    #[serde(default)]
    apps: Vec<ResourceDefinition>,
}

/// A catalog entry tagged with the list it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub category: ResourceCategory,
    pub definition: ResourceDefinition,
}

/// Both catalogs, merged
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Parses the games catalog from a JSON string
    pub fn parse_games(json: &str) -> Result<Vec<ResourceDefinition>> {
        let file: GamesFile = serde_json::from_str(json).context("invalid games catalog")?;
        Ok(file.games)
    }

    /// Parses the apps catalog from a JSON string
    pub fn parse_apps(json: &str) -> Result<Vec<ResourceDefinition>> {
        let file: AppsFile = serde_json::from_str(json).context("invalid apps catalog")?;
        Ok(file.apps)
    }

    /// Reads one catalog file
    pub fn load_file(path: &Path, category: ResourceCategory) -> Result<Vec<ResourceDefinition>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        match category {
            ResourceCategory::Game => Self::parse_games(&content),
            ResourceCategory::App => Self::parse_apps(&content),
        }
        .with_context(|| format!("failed to parse catalog {}", path.display()))
    }

    /// Loads both configured catalogs
    ///
    /// A catalog that cannot be read or parsed is logged and contributes
    /// no entries.
    pub fn load_configured(config: &CatalogConfig) -> Self {
        let load = |path: &Path, category: ResourceCategory| match Self::load_file(path, category) {
            Ok(list) => {
                info!(path = %path.display(), entries = list.len(), "Loaded catalog");
                list
            }
            Err(e) => {
                error!(path = %path.display(), error = %format!("{e:#}"), "Catalog unavailable");
                Vec::new()
            }
        };

        let games = load(&config.games_file, ResourceCategory::Game);
        let apps = load(&config.apps_file, ResourceCategory::App);
        Self::from_lists(games, apps)
    }

    /// Builds a catalog from already-loaded lists
    pub fn from_lists(games: Vec<ResourceDefinition>, apps: Vec<ResourceDefinition>) -> Self {
        let entries = games
            .into_iter()
            .map(|definition| CatalogEntry {
                category: ResourceCategory::Game,
                definition,
            })
            .chain(apps.into_iter().map(|definition| CatalogEntry {
                category: ResourceCategory::App,
                definition,
            }))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries with `enabled: true`
    pub fn enabled(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.definition.enabled)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
