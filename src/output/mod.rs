//! Output module for persisting run batches and reporting
//!
//! This module handles:
//! - Writing and reading the dated JSON batches between stages
//! - Loading variant batches into SQLite with full-replace semantics
//! - Summarizing a run

mod json_batch;
mod sqlite_loader;
pub mod stats;
mod traits;

pub use json_batch::{read_product_urls, read_variants, JsonBatchStore};
pub use sqlite_loader::{dated_table_name, SqliteLoader};
pub use stats::{print_summary, RunSummary};
pub use traits::{BatchSink, OutputError, OutputResult};
