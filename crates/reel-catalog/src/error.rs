//! Catalog error types.

use std::path::PathBuf;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Media library not found: {0}")]
    LibraryNotFound(PathBuf),

    #[error("Catalog metadata not found: {0}")]
    MetadataNotFound(PathBuf),

    #[error("Invalid catalog metadata in {path}: {source}")]
    InvalidMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Io(_))
    }
}
