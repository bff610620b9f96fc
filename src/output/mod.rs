//! Output module for run reports
//!
//! This module handles:
//! - Condensing per-source crawl reports into run statistics
//! - Printing statistics after a run
//! - Writing a markdown digest of the collected jobs

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_digest, generate_markdown_digest};
pub use stats::{print_statistics, RunStatistics, SourceStatistics};
