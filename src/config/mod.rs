//! Configuration module for jobtrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use jobtrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("jobtrawl.toml")).unwrap();
//! println!("Detail workers: {}", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BrowserConfig, BrowserDriver, Config, CrawlerConfig, OutputConfig, SearchConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
