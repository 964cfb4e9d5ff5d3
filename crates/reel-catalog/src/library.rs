//! Library catalog backed by `metadata.json`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use reel_models::ClipRef;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};

/// One indexed clip in the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Clip path, relative to the library root unless absolute
    pub path: PathBuf,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl CatalogEntry {
    /// Whether `keyword` equals a tag or occurs in the description, ignoring case.
    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return false;
        }
        self.tags.iter().any(|t| t.to_lowercase() == keyword)
            || self.description.to_lowercase().contains(&keyword)
    }
}

/// Source of clip references for a job.
#[async_trait]
pub trait ClipCatalog: Send + Sync {
    /// Clips matching `keywords`, de-duplicated, keyword order first.
    async fn select_clips(&self, keywords: &[String]) -> CatalogResult<Vec<ClipRef>>;

    /// Fallback clips used when no keyword matches.
    async fn default_clips(&self) -> CatalogResult<Vec<ClipRef>>;
}

/// Read-only catalog loaded once and shared between jobs.
#[derive(Debug, Clone)]
pub struct LibraryCatalog {
    config: CatalogConfig,
    entries: Vec<CatalogEntry>,
}

impl LibraryCatalog {
    /// Load the catalog file under `config.library_root`.
    pub async fn open(config: CatalogConfig) -> CatalogResult<Self> {
        if !config.library_root.is_dir() {
            return Err(CatalogError::LibraryNotFound(config.library_root.clone()));
        }

        let metadata_path = config.metadata_path();
        let raw = match tokio::fs::read(&metadata_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::MetadataNotFound(metadata_path));
            }
            Err(e) => return Err(e.into()),
        };

        let entries: Vec<CatalogEntry> =
            serde_json::from_slice(&raw).map_err(|source| CatalogError::InvalidMetadata {
                path: metadata_path.clone(),
                source,
            })?;

        info!(
            entries = entries.len(),
            "Loaded media catalog from {}",
            metadata_path.display()
        );

        Ok(Self::from_entries(config, entries))
    }

    /// Build a catalog from already loaded entries.
    pub fn from_entries(config: CatalogConfig, entries: Vec<CatalogEntry>) -> Self {
        Self { config, entries }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.library_root.join(path)
        }
    }

    /// Matching entry paths, keyword order outer, first match wins.
    pub fn matching_paths(&self, keywords: &[String]) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut matched = Vec::new();

        for keyword in keywords {
            for entry in self.entries.iter().filter(|e| e.matches(keyword)) {
                let path = self.resolve(&entry.path);
                if seen.insert(path.clone()) {
                    matched.push(path);
                }
            }
        }

        matched
    }
}

#[async_trait]
impl ClipCatalog for LibraryCatalog {
    async fn select_clips(&self, keywords: &[String]) -> CatalogResult<Vec<ClipRef>> {
        let paths = self.matching_paths(keywords);
        debug!(keywords = ?keywords, matched = paths.len(), "Catalog lookup");
        Ok(paths.into_iter().map(ClipRef::new).collect())
    }

    async fn default_clips(&self) -> CatalogResult<Vec<ClipRef>> {
        let dir = self.config.default_clip_dir();

        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Default clip directory missing: {}", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut clips = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            let is_mp4 = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
            if is_mp4 && entry.file_type().await?.is_file() {
                clips.push(path);
            }
        }
        clips.sort();

        Ok(clips.into_iter().map(ClipRef::new).collect())
    }
}
