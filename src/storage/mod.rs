//! Storage module for collected jobs
//!
//! The crawl engine never persists anything itself; the binary hands finished
//! records to a [`JobStore`]. This module provides:
//! - SQLite database initialization and schema management
//! - Upserts keyed by canonical job URL
//! - Filtered reads for listing stored jobs

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteJobStore;
pub use traits::{JobFilter, JobStore, StorageError, StorageResult};

use std::path::Path;

/// Opens (or creates) the job database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteJobStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_store(path: &Path) -> StorageResult<SqliteJobStore> {
    SqliteJobStore::new(path)
}
