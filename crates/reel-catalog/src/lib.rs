//! Media library catalog.
//!
//! Selects clip references for a script: keywords are extracted from the
//! text, matched against the library's `metadata.json`, and a default clip
//! set covers scripts with no match.

pub mod config;
pub mod error;
pub mod keywords;
pub mod library;

pub use config::{CatalogConfig, DEFAULT_KEYWORD_COUNT};
pub use error::{CatalogError, CatalogResult};
pub use keywords::KeywordExtractor;
pub use library::{CatalogEntry, ClipCatalog, LibraryCatalog};
