//! Jobtrawl: a concurrent job-listing crawler
//!
//! This crate drives a browser through the search results of several job sites,
//! deduplicates the listings it finds, and enriches each one with the full
//! description from its detail page.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod source;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Jobtrawl operations
///
/// Only [`TrawlError::BrowserLaunch`] ever escapes a crawl; every other variant
/// is logged and absorbed by the unit of work that raised it.
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("Login failed for {source_name}: {reason}")]
    LoginFailure { source_name: String, reason: String },

    #[error("Navigation timeout for {url}")]
    NavigationTimeout { url: String },

    #[error("Selector not found: {selector}")]
    SelectorNotFound { selector: String },

    #[error("Detail fetch failed for {url}: {reason}")]
    DetailFetch { url: String, reason: String },

    #[error("Query setup failed for '{query}': {reason}")]
    QuerySetup { query: String, reason: String },

    #[error("Work queue closed")]
    QueueClosed,

    #[error("Crawl task failed: {0}")]
    Task(String),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Empty link")]
    Empty,
}

/// Result type alias for Jobtrawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{scrape, scrape_all, CrawlSession, SearchRequest};
pub use source::SourceAdapter;
pub use state::{JobRecord, JobSource};
pub use url::canonicalize_job_url;
