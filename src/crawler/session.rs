//! Crawl session: one source, one browser, one bounded run
//!
//! A session acquires a browser from its launcher, runs the adapter's login,
//! starts the detail worker pool, walks every (title, location) query and
//! waits for the pool to drain. Only a failed browser launch is returned as an
//! error; every other failure is logged and the session returns whatever was
//! collected.

use crate::browser::{BrowserLauncher, BrowserPage, BrowserSession};
use crate::config::{CrawlerConfig, SearchConfig};
use crate::crawler::frontier::Frontier;
use crate::crawler::pool::{DetailWorkerPool, PoolStats, SharedResults};
use crate::crawler::queue::work_queue;
use crate::crawler::traversal::{ListingTraversal, SearchQuery, TraversalReport};
use crate::source::{LoginOutcome, SourceAdapter};
use crate::state::JobRecord;
use crate::TrawlError;
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};
use url::Url;

/// What one run searches for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub titles: Vec<String>,
    pub locations: Vec<String>,
    pub remote_only: bool,
    /// Overall cap on returned records
    pub limit: Option<usize>,
}

impl SearchRequest {
    /// Every (title, location) pair, titles outermost, in input order
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.titles
            .iter()
            .flat_map(|title| {
                self.locations.iter().map(move |location| SearchQuery {
                    title: title.clone(),
                    location: location.clone(),
                })
            })
            .collect()
    }
}

impl From<&SearchConfig> for SearchRequest {
    fn from(config: &SearchConfig) -> Self {
        Self {
            titles: config.titles.clone(),
            locations: config.locations.clone(),
            remote_only: config.remote_only,
            limit: config.limit,
        }
    }
}

/// Summary of one session
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub source: String,
    pub login: LoginOutcome,
    pub queries: Vec<TraversalReport>,
    pub enrichment: PoolStats,
    /// Records returned after the limit was applied
    pub collected: usize,
    pub elapsed: Duration,
}

impl CrawlReport {
    /// Records pushed to the detail workers across all queries
    pub fn emitted(&self) -> usize {
        self.queries.iter().map(|q| q.emitted).sum()
    }

    /// Surfaced listings skipped because an earlier query had queued them
    pub fn duplicates(&self) -> usize {
        self.queries.iter().map(|q| q.duplicates).sum()
    }
}

/// Records and report of a finished session
#[derive(Debug, Clone)]
pub struct CrawlOutput {
    pub records: Vec<JobRecord>,
    pub report: CrawlReport,
}

/// Runs searches for one source
pub struct CrawlSession {
    adapter: Arc<SourceAdapter>,
    launcher: Arc<dyn BrowserLauncher>,
    config: CrawlerConfig,
}

impl CrawlSession {
    pub fn new(
        adapter: Arc<SourceAdapter>,
        launcher: Arc<dyn BrowserLauncher>,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            adapter,
            launcher,
            config,
        }
    }

    pub fn adapter(&self) -> &SourceAdapter {
        &self.adapter
    }

    /// Runs every query of `request` and returns the enriched records
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutput)` - Possibly partial results, at most `request.limit` records
    /// * `Err(TrawlError::BrowserLaunch)` - No browser could be acquired
    pub async fn run(&self, request: &SearchRequest) -> Result<CrawlOutput, TrawlError> {
        let started = Instant::now();
        let base = self.adapter.base()?;

        let session = self
            .launcher
            .launch()
            .await
            .map_err(|e| TrawlError::BrowserLaunch(e.to_string()))?;
        tracing::info!(source = %self.adapter.name, "Browser session started");

        let (records, login, queries, enrichment) = self.crawl(&session, &base, request).await;

        if let Err(e) = session.close().await {
            tracing::warn!(source = %self.adapter.name, "Failed to close browser: {}", e);
        }

        let report = CrawlReport {
            source: self.adapter.name.clone(),
            login,
            queries,
            enrichment,
            collected: records.len(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            source = %report.source,
            collected = report.collected,
            emitted = report.emitted(),
            placeholder = report.enrichment.placeholder,
            "Session finished in {:.1}s",
            report.elapsed.as_secs_f64()
        );

        Ok(CrawlOutput { records, report })
    }

    async fn crawl(
        &self,
        session: &Arc<dyn BrowserSession>,
        base: &Url,
        request: &SearchRequest,
    ) -> (Vec<JobRecord>, LoginOutcome, Vec<TraversalReport>, PoolStats) {
        // The listing page belongs to the traversal; workers open their own
        let mut listing_page = match session.new_page().await {
            Ok(page) => Some(page),
            Err(e) => {
                tracing::warn!(source = %self.adapter.name, "Could not open listing page: {}", e);
                None
            }
        };

        let login = match (&self.adapter.login, listing_page.as_mut()) {
            (None, _) => LoginOutcome::Skipped,
            (Some(_), None) => LoginOutcome::Failed("no page to log in with".to_string()),
            (Some(_), Some(page)) => self.login(page.as_mut(), base).await,
        };

        let quota = self
            .config
            .query_quota(request.limit, request.titles.len());
        let frontier = Frontier::new();
        let results = SharedResults::default();
        let (producer, consumer) = work_queue(self.config.queue_capacity);
        let pool = DetailWorkerPool::start(
            Arc::clone(session),
            Arc::clone(&self.adapter),
            consumer,
            Arc::clone(&results),
            &self.config,
        );

        let traversal = ListingTraversal::new(&self.adapter, base, &frontier, &self.config);
        let mut reports = Vec::new();
        for query in request.queries() {
            let report = match listing_page.as_deref_mut() {
                Some(page) => {
                    match traversal
                        .run(page, &query, request.remote_only, quota, &producer)
                        .await
                    {
                        Ok(report) => report,
                        Err(e) => {
                            tracing::warn!(source = %self.adapter.name, "Skipping query: {}", e);
                            TraversalReport::failed(&query, e.to_string())
                        }
                    }
                }
                None => TraversalReport::failed(&query, "no listing page".to_string()),
            };
            reports.push(report);
        }

        if let Some(mut page) = listing_page {
            if let Err(e) = page.close().await {
                tracing::debug!("Failed to close listing page: {}", e);
            }
        }

        // Closing the producer side lets the workers exit once drained
        drop(producer);
        let enrichment = pool.finish().await;

        let mut records = std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner));
        if let Some(limit) = request.limit {
            records.truncate(limit);
        }

        (records, login, reports, enrichment)
    }

    async fn login(&self, page: &mut dyn BrowserPage, base: &Url) -> LoginOutcome {
        let Some(procedure) = &self.adapter.login else {
            return LoginOutcome::Skipped;
        };

        match procedure
            .run(page, &self.adapter.name, base, self.config.navigation_timeout())
            .await
        {
            Ok(()) => {
                tracing::info!(source = %self.adapter.name, "Logged in");
                LoginOutcome::Authenticated
            }
            Err(e) => {
                tracing::warn!("{}; continuing without login", e);
                LoginOutcome::Failed(e.to_string())
            }
        }
    }
}
