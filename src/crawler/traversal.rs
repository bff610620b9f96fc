//! Listing traversal: one (title, location) query against a search page
//!
//! The traversal walks [`TraversalState`] from `Navigating` to `Done`:
//!
//! ```text
//! Navigating -> WaitingForResults -> Harvesting -> ScrollOrPaginate -> Harvesting ...
//!                                                        |
//!                                     (next button) -> WaitingForResults
//! ```
//!
//! After every harvest pass the termination rules are checked in order: quota
//! reached, no next control (paginated sources), height unchanged with nothing
//! new in the pass (infinite-scroll sources). Stagnation only looks at URLs
//! this query has not surfaced yet, so a pass made of jobs that earlier queries
//! already emitted still counts as progress.
//!
//! A next-button click can return before the next page has replaced the old
//! results, so the traversal remembers the first card it saw and only
//! harvests again once a different first card has rendered.

use crate::browser::{BrowserError, BrowserPage};
use crate::config::CrawlerConfig;
use crate::crawler::frontier::{Frontier, QuerySeen};
use crate::crawler::queue::QueueProducer;
use crate::extract::{extract, CardSnapshot, Field};
use crate::source::{Pagination, SourceAdapter};
use crate::state::{JobRecord, TraversalState};
use crate::url::canonicalize_job_url;
use crate::TrawlError;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// How often the result cards are re-read while a next page loads
const FRESH_CARDS_POLL: Duration = Duration::from_millis(100);

/// One (title, location) pair of a search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    pub location: String,
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.title, self.location)
    }
}

/// Why a query stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    QuotaReached,
    NoNextPage,
    Stagnated,
    /// The result container never appeared
    NoResults,
    /// Safety bound on harvest passes hit
    PassLimit,
    /// The query could not be set up or was interrupted
    Failed(String),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaReached => f.write_str("quota reached"),
            Self::NoNextPage => f.write_str("no next page"),
            Self::Stagnated => f.write_str("stagnated"),
            Self::NoResults => f.write_str("no results"),
            Self::PassLimit => f.write_str("pass limit"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Outcome of one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalReport {
    pub query: SearchQuery,
    /// Distinct URLs this query surfaced (counted toward its quota)
    pub harvested: usize,
    /// Records pushed to the work queue
    pub emitted: usize,
    /// Surfaced URLs already emitted by an earlier query
    pub duplicates: usize,
    pub passes: usize,
    pub termination: Termination,
}

impl TraversalReport {
    fn new(query: &SearchQuery) -> Self {
        Self {
            query: query.clone(),
            harvested: 0,
            emitted: 0,
            duplicates: 0,
            passes: 0,
            termination: Termination::NoResults,
        }
    }

    pub(crate) fn failed(query: &SearchQuery, reason: String) -> Self {
        Self {
            termination: Termination::Failed(reason),
            ..Self::new(query)
        }
    }
}

/// Drives queries for one source against its listing page
pub struct ListingTraversal<'a> {
    adapter: &'a SourceAdapter,
    base: &'a Url,
    frontier: &'a Frontier,
    config: &'a CrawlerConfig,
}

impl<'a> ListingTraversal<'a> {
    pub fn new(
        adapter: &'a SourceAdapter,
        base: &'a Url,
        frontier: &'a Frontier,
        config: &'a CrawlerConfig,
    ) -> Self {
        Self {
            adapter,
            base,
            frontier,
            config,
        }
    }

    /// Runs one query to completion, pushing new basic records to `output`
    ///
    /// Fails only when the query cannot be set up (bad search URL or failed
    /// navigation); every later problem ends the query with a report.
    pub async fn run(
        &self,
        page: &mut dyn BrowserPage,
        query: &SearchQuery,
        remote_only: bool,
        quota: usize,
        output: &QueueProducer,
    ) -> Result<TraversalReport, TrawlError> {
        let setup_failure = |reason: String| TrawlError::QuerySetup {
            query: query.to_string(),
            reason,
        };

        let mut state = TraversalState::Navigating;
        let mut report = TraversalReport::new(query);
        let mut seen = QuerySeen::new(quota);
        let mut last_height = 0u64;
        let mut new_in_pass = false;
        // First card of the page a next-button click left behind
        let mut stale_card: Option<String> = None;

        let search_url = self
            .adapter
            .build_search_url(&query.title, &query.location, remote_only)
            .map_err(|e| setup_failure(e.to_string()))?;
        tracing::info!(
            source = %self.adapter.name,
            title = %query.title,
            location = %query.location,
            quota,
            "Searching {}",
            search_url
        );

        page.navigate(search_url.as_str(), self.config.navigation_timeout())
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    setup_failure(
                        TrawlError::NavigationTimeout {
                            url: search_url.to_string(),
                        }
                        .to_string(),
                    )
                } else {
                    setup_failure(e.to_string())
                }
            })?;
        advance(&mut state, TraversalState::WaitingForResults);

        let termination = loop {
            match state {
                TraversalState::WaitingForResults => {
                    let ready = &self.adapter.listing.results_ready;
                    if let Err(e) = page
                        .wait_for_selector(ready, self.config.results_timeout())
                        .await
                    {
                        let missing = TrawlError::SelectorNotFound {
                            selector: ready.clone(),
                        };
                        if report.passes == 0 {
                            tracing::warn!(query = %query, "No results rendered: {} ({})", missing, e);
                            break Termination::NoResults;
                        }
                        tracing::warn!(query = %query, "Next page did not render: {} ({})", missing, e);
                        break Termination::Failed(missing.to_string());
                    }
                    if let Some(stale) = stale_card.take() {
                        if let Err(e) = self.wait_for_fresh_cards(page, &stale).await {
                            tracing::warn!(query = %query, "Next page kept the old results: {}", e);
                            break Termination::Failed(e.to_string());
                        }
                    }

                    if report.passes == 0 {
                        last_height = page.scroll_height().await.unwrap_or(0);
                    }
                    advance(&mut state, TraversalState::Harvesting);
                }

                TraversalState::Harvesting => {
                    report.passes += 1;
                    match self.harvest(page, &mut seen, output, &mut report).await {
                        Ok(found_new) => new_in_pass = found_new,
                        Err(e) => {
                            tracing::warn!(query = %query, "Harvest interrupted: {}", e);
                            break Termination::Failed(e.to_string());
                        }
                    }

                    if seen.quota_reached() {
                        break Termination::QuotaReached;
                    }
                    if report.passes >= self.config.max_passes {
                        tracing::warn!(query = %query, "Stopped after {} passes", report.passes);
                        break Termination::PassLimit;
                    }
                    advance(&mut state, TraversalState::ScrollOrPaginate);
                }

                TraversalState::ScrollOrPaginate => match &self.adapter.pagination {
                    Pagination::NextButton { selector } => {
                        let has_next = page
                            .query_all(selector)
                            .await
                            .map(|found| !found.is_empty())
                            .unwrap_or(false);
                        if !has_next {
                            break Termination::NoNextPage;
                        }
                        stale_card = self.rendered_cards(page).await.into_iter().next();
                        if let Err(e) = page.click(selector, self.config.navigation_timeout()).await {
                            tracing::warn!(query = %query, "Could not open next page: {}", e);
                            break Termination::Failed(e.to_string());
                        }
                        advance(&mut state, TraversalState::WaitingForResults);
                    }
                    Pagination::InfiniteScroll => {
                        if let Err(e) = page.scroll_to_bottom().await {
                            tracing::warn!(query = %query, "Scroll failed: {}", e);
                            break Termination::Stagnated;
                        }
                        tokio::time::sleep(self.config.scroll_settle()).await;

                        let height = page.scroll_height().await.unwrap_or(last_height);
                        if height == last_height && !new_in_pass {
                            break Termination::Stagnated;
                        }
                        last_height = height;
                        advance(&mut state, TraversalState::Harvesting);
                    }
                },

                TraversalState::Navigating | TraversalState::Done => {
                    break Termination::Failed(format!("unexpected state {}", state));
                }
            }
        };
        if !state.is_terminal() {
            advance(&mut state, TraversalState::Done);
        }

        tracing::info!(
            source = %self.adapter.name,
            query = %query,
            harvested = report.harvested,
            emitted = report.emitted,
            duplicates = report.duplicates,
            passes = report.passes,
            "Query finished: {}",
            termination
        );
        report.termination = termination;
        Ok(report)
    }

    /// One pass over the rendered cards; returns true if any URL was new to this query
    async fn harvest(
        &self,
        page: &mut dyn BrowserPage,
        seen: &mut QuerySeen,
        output: &QueueProducer,
        report: &mut TraversalReport,
    ) -> Result<bool, TrawlError> {
        let cards = self.rendered_cards(page).await;
        let records = self.parse_cards(&cards);
        tracing::debug!(cards = cards.len(), parsed = records.len(), "Harvest pass {}", report.passes);

        let mut found_new = false;
        for (index, record) in records.iter().enumerate() {
            if !seen.observe(&record.url) {
                continue;
            }
            found_new = true;
            report.harvested += 1;

            if self.frontier.insert_if_absent(&record.url) {
                tracing::trace!(url = %record.url, "Queued {}", record.title);
                output.push(record.clone()).await?;
                report.emitted += 1;
            } else {
                tracing::debug!(url = %record.url, "Already queued by an earlier query");
                report.duplicates += 1;
            }

            if seen.quota_reached() {
                // The rest of this batch is never fetched by later queries either
                self.frontier
                    .mark_all_seen(records[index + 1..].iter().map(|r| &r.url));
                break;
            }
        }

        Ok(found_new)
    }

    /// Waits until the first result card differs from `stale`
    async fn wait_for_fresh_cards(
        &self,
        page: &mut dyn BrowserPage,
        stale: &str,
    ) -> Result<(), BrowserError> {
        let timeout = self.config.results_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            let cards = self.rendered_cards(page).await;
            if cards.first().is_some_and(|first| first != stale) {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(BrowserError::Timeout {
                    operation: "wait for next page results".to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(FRESH_CARDS_POLL.min(deadline - now)).await;
        }
    }

    /// Outer HTML of the result cards, using the first selector that matches
    async fn rendered_cards(&self, page: &mut dyn BrowserPage) -> Vec<String> {
        for selector in &self.adapter.listing.result_item {
            match page.query_all(selector).await {
                Ok(cards) if !cards.is_empty() => return cards,
                Ok(_) => {}
                Err(e) => tracing::debug!("Result selector {} failed: {}", selector, e),
            }
        }
        Vec::new()
    }

    /// Extracts basic records from card HTML, in DOM order
    fn parse_cards(&self, cards: &[String]) -> Vec<JobRecord> {
        let listing = &self.adapter.listing;
        cards
            .iter()
            .filter_map(|html| {
                let card = CardSnapshot::parse(html);
                let node = card.node();

                let href = extract(node, &listing.link, Field::Link);
                let url = match canonicalize_job_url(&href, self.base, self.adapter.strip_query) {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::debug!("Skipping card without usable link ({}): {:?}", e, href);
                        return None;
                    }
                };

                let date = extract(node, &listing.date_posted, Field::DatePosted);
                Some(JobRecord::basic(
                    extract(node, &listing.title, Field::Title),
                    extract(node, &listing.company, Field::Company),
                    extract(node, &listing.location, Field::Location),
                    url.to_string(),
                    self.adapter.source(),
                    (!Field::DatePosted.is_default(&date)).then_some(date),
                ))
            })
            .collect()
    }
}

fn advance(state: &mut TraversalState, next: TraversalState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal traversal transition {} -> {}",
        state,
        next
    );
    tracing::trace!("Traversal {} -> {}", state, next);
    *state = next;
}
