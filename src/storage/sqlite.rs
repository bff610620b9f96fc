//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobStore trait.

use crate::state::{JobRecord, JobSource};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobFilter, JobStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;

/// SQLite job store
pub struct SqliteJobStore {
    conn: Connection,
}

impl SqliteJobStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteJobStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl JobStore for SqliteJobStore {
    fn save_jobs(&mut self, jobs: &[JobRecord]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO jobs (url, title, company, location, source, date_posted,
                                   description, scraped_at, first_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(url) DO UPDATE SET
                    title = excluded.title,
                    company = excluded.company,
                    location = excluded.location,
                    source = excluded.source,
                    date_posted = excluded.date_posted,
                    description = excluded.description,
                    scraped_at = excluded.scraped_at",
            )?;

            for job in jobs {
                written += stmt.execute(params![
                    job.url,
                    job.title,
                    job.company,
                    job.location,
                    job.source.name(),
                    job.date_posted,
                    job.description,
                    job.scraped_at.to_rfc3339(),
                    now,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Saved {} jobs", written);
        Ok(written)
    }

    fn get_jobs(&self, filter: &JobFilter) -> StorageResult<Vec<JobRecord>> {
        let mut sql = String::from(
            "SELECT title, company, location, url, source, date_posted, description, scraped_at
             FROM jobs WHERE 1 = 1",
        );
        let mut args: Vec<String> = Vec::new();

        if let Some(source) = &filter.source {
            args.push(source.name().to_string());
            sql.push_str(&format!(" AND source = ?{} COLLATE NOCASE", args.len()));
        }
        if let Some(title) = &filter.title_contains {
            args.push(format!("%{}%", title));
            sql.push_str(&format!(" AND title LIKE ?{}", args.len()));
        }
        sql.push_str(" ORDER BY scraped_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut jobs = Vec::new();
        for row in rows {
            let (title, company, location, url, source, date_posted, description, scraped_at) =
                row?;
            jobs.push(JobRecord {
                title,
                company,
                location,
                url,
                source: JobSource::from_name(&source),
                date_posted,
                description,
                scraped_at: parse_timestamp(&scraped_at)?,
            });
        }

        Ok(jobs)
    }

    fn count_jobs(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
