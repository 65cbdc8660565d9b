//! Batch sink trait and error types
//!
//! A sink receives the two batches a run produces: the ordered product URLs
//! and the ordered variant records. Each batch is handed over once, whole.

use crate::crawler::VariantRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error on '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("Variant id {id} of '{url}' does not fit an SQLite integer")]
    IdOutOfRange { url: String, id: u64 },
}

impl OutputError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Receives the batches produced by a run
pub trait BatchSink {
    /// Persists the product URL batch, replacing any previous one
    fn write_product_urls(&mut self, urls: &[String]) -> OutputResult<()>;

    /// Persists the variant record batch, replacing any previous one
    fn write_variants(&mut self, records: &[VariantRecord]) -> OutputResult<()>;
}
