//! Crawl engine
//!
//! This module contains the crawl-and-enrich pipeline, including:
//! - Run-wide and per-query deduplication (`Frontier`)
//! - The work queue between listing traversal and detail workers
//! - Listing traversal for paginated and infinite-scroll result lists
//! - The detail worker pool
//! - Session orchestration and the `scrape` entry points

mod frontier;
mod pool;
mod queue;
mod session;
mod traversal;

pub use frontier::{Frontier, QuerySeen};
pub use pool::{DetailWorkerPool, PoolStats, SharedResults};
pub use queue::{work_queue, QueueConsumer, QueueProducer, WorkTicket};
pub use session::{CrawlOutput, CrawlReport, CrawlSession, SearchRequest};
pub use traversal::{ListingTraversal, SearchQuery, Termination, TraversalReport};

use crate::browser::BrowserLauncher;
use crate::config::CrawlerConfig;
use crate::source::SourceAdapter;
use crate::state::JobRecord;
use crate::TrawlError;
use std::sync::Arc;

/// Scrapes one source
///
/// Launches a browser, runs every query of `request` and returns the enriched
/// records. Per-query and per-record failures are logged, never returned.
///
/// # Returns
///
/// * `Ok(Vec<JobRecord>)` - Records with unique URLs, at most `request.limit` of them
/// * `Err(TrawlError::BrowserLaunch)` - The browser could not be started
pub async fn scrape(
    adapter: SourceAdapter,
    launcher: Arc<dyn BrowserLauncher>,
    config: &CrawlerConfig,
    request: &SearchRequest,
) -> Result<Vec<JobRecord>, TrawlError> {
    let session = CrawlSession::new(Arc::new(adapter), launcher, config.clone());
    session.run(request).await.map(|output| output.records)
}

/// Result of one source in [`scrape_all`]
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: String,
    pub result: Result<CrawlOutput, TrawlError>,
}

/// Scrapes several sources in parallel, each with its own browser session
///
/// Outcomes are returned in the order of `adapters`. A failing source does
/// not affect the others.
pub async fn scrape_all(
    adapters: Vec<SourceAdapter>,
    launcher: Arc<dyn BrowserLauncher>,
    config: &CrawlerConfig,
    request: &SearchRequest,
) -> Vec<SourceOutcome> {
    let handles: Vec<_> = adapters
        .into_iter()
        .map(|adapter| {
            let source = adapter.name.clone();
            let session = CrawlSession::new(Arc::new(adapter), Arc::clone(&launcher), config.clone());
            let request = request.clone();
            let handle = tokio::spawn(async move { session.run(&request).await });
            (source, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (source, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(source = %source, "Crawl task failed: {}", e);
                Err(TrawlError::Task(e.to_string()))
            }
        };
        if let Err(e) = &result {
            tracing::error!(source = %source, "Source failed: {}", e);
        }
        outcomes.push(SourceOutcome { source, result });
    }
    outcomes
}
