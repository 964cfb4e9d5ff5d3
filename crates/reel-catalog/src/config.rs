//! Catalog configuration.

use std::path::PathBuf;

/// Default number of keywords extracted from a script.
pub const DEFAULT_KEYWORD_COUNT: usize = 10;

/// Media library configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Library root directory
    pub library_root: PathBuf,
    /// Catalog file name under the root
    pub metadata_file: String,
    /// Fallback clip directory under the root
    pub default_dir: String,
    /// Keywords extracted per script
    pub keyword_count: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            library_root: PathBuf::from("./media_library"),
            metadata_file: "metadata.json".to_string(),
            default_dir: "default".to_string(),
            keyword_count: DEFAULT_KEYWORD_COUNT,
        }
    }
}

impl CatalogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            library_root: std::env::var("CATALOG_LIBRARY_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.library_root),
            metadata_file: std::env::var("CATALOG_METADATA_FILE")
                .unwrap_or(defaults.metadata_file),
            default_dir: std::env::var("CATALOG_DEFAULT_DIR").unwrap_or(defaults.default_dir),
            keyword_count: std::env::var("CATALOG_KEYWORD_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.keyword_count),
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.library_root.join(&self.metadata_file)
    }

    pub fn default_clip_dir(&self) -> PathBuf {
        self.library_root.join(&self.default_dir)
    }
}
