//! Storage traits and error types
//!
//! This module defines the trait interface for job storage backends and
//! associated error types.

use crate::state::{JobRecord, JobSource};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Selects stored jobs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub source: Option<JobSource>,
    /// Case-insensitive substring of the title
    pub title_contains: Option<String>,
    pub limit: Option<usize>,
}

/// Persistence for collected jobs
///
/// Records are keyed by URL: saving a URL that is already stored replaces its
/// fields instead of adding a row.
pub trait JobStore {
    /// Upserts records, returning how many rows were written
    fn save_jobs(&mut self, jobs: &[JobRecord]) -> StorageResult<usize>;

    /// Returns matching records, most recently scraped first
    fn get_jobs(&self, filter: &JobFilter) -> StorageResult<Vec<JobRecord>>;

    /// Number of stored records
    fn count_jobs(&self) -> StorageResult<usize>;
}
