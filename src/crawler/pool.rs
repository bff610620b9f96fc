//! Detail worker pool
//!
//! `W` tasks share one [`QueueConsumer`]. Each worker takes a basic record,
//! opens its own page, reads the detail page and appends the enriched record
//! to the shared results. A failed fetch still appends the record, with the
//! placeholder description. The pool finishes once every pushed record has
//! been acknowledged, not after a fixed number of items.

use crate::browser::{BrowserPage, BrowserSession};
use crate::config::CrawlerConfig;
use crate::crawler::queue::QueueConsumer;
use crate::extract::extract_description;
use crate::source::SourceAdapter;
use crate::state::{JobRecord, DESCRIPTION_NOT_FOUND};
use crate::TrawlError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

/// Enrichment counts for one pool
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Records that received a real description
    pub enriched: usize,
    /// Records kept with the placeholder description
    pub placeholder: usize,
}

#[derive(Debug, Default)]
struct Counters {
    enriched: AtomicUsize,
    placeholder: AtomicUsize,
}

/// Append-only result collection shared by the workers
pub type SharedResults = Arc<Mutex<Vec<JobRecord>>>;

/// A running set of detail workers
pub struct DetailWorkerPool {
    workers: JoinSet<()>,
    consumer: QueueConsumer,
    counters: Arc<Counters>,
}

impl DetailWorkerPool {
    /// Spawns `config.workers` workers reading from `consumer`
    pub fn start(
        session: Arc<dyn BrowserSession>,
        adapter: Arc<SourceAdapter>,
        consumer: QueueConsumer,
        results: SharedResults,
        config: &CrawlerConfig,
    ) -> Self {
        let counters = Arc::new(Counters::default());
        let mut workers = JoinSet::new();

        for id in 0..config.workers.max(1) {
            let worker = Worker {
                id,
                session: Arc::clone(&session),
                adapter: Arc::clone(&adapter),
                consumer: consumer.clone(),
                results: Arc::clone(&results),
                counters: Arc::clone(&counters),
                config: config.clone(),
            };
            workers.spawn(worker.run());
        }

        tracing::debug!(workers = workers.len(), "Detail worker pool started");
        Self {
            workers,
            consumer,
            counters,
        }
    }

    /// Waits until every pushed record is processed and the workers have exited
    ///
    /// Call after dropping every producer; otherwise the workers keep waiting
    /// for more records.
    pub async fn finish(self) -> PoolStats {
        let Self {
            mut workers,
            consumer,
            counters,
        } = self;

        // Workers exit on their own once the queue is closed and empty. If they
        // all die early, stop waiting for a drain that cannot happen.
        tokio::select! {
            _ = consumer.wait_drained() => {}
            _ = join_all(&mut workers) => {}
        }
        join_all(&mut workers).await;

        let pending = consumer.pending();
        if pending > 0 {
            tracing::warn!(pending, "Detail workers exited with records still queued");
        }

        PoolStats {
            enriched: counters.enriched.load(Ordering::SeqCst),
            placeholder: counters.placeholder.load(Ordering::SeqCst),
        }
    }
}

async fn join_all(workers: &mut JoinSet<()>) {
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Detail worker panicked: {}", e);
        }
    }
}

struct Worker {
    id: usize,
    session: Arc<dyn BrowserSession>,
    adapter: Arc<SourceAdapter>,
    consumer: QueueConsumer,
    results: SharedResults,
    counters: Arc<Counters>,
    config: CrawlerConfig,
}

impl Worker {
    async fn run(self) {
        while let Some(ticket) = self.consumer.next().await {
            let record = ticket.record().clone();
            let url = record.url.clone();

            let enriched = match self.fetch_description(&url).await {
                Ok(description) => {
                    self.counters.enriched.fetch_add(1, Ordering::SeqCst);
                    record.with_description(description)
                }
                Err(e) => {
                    tracing::warn!(worker = self.id, url = %url, "{}", e);
                    self.counters.placeholder.fetch_add(1, Ordering::SeqCst);
                    record.with_description(DESCRIPTION_NOT_FOUND.to_string())
                }
            };

            self.results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(enriched);
            tracing::trace!(worker = self.id, url = %url, "Enriched");

            // Acknowledge only after the record is in the results
            drop(ticket);
        }
        tracing::debug!(worker = self.id, "Detail worker exiting");
    }

    /// Fetches one detail page in its own tab, always closing the tab
    async fn fetch_description(&self, url: &str) -> Result<String, TrawlError> {
        let detail_failure = |reason: String| TrawlError::DetailFetch {
            url: url.to_string(),
            reason,
        };

        let mut page = self
            .session
            .new_page()
            .await
            .map_err(|e| detail_failure(e.to_string()))?;

        let result = self.read_page(page.as_mut(), url).await;
        if let Err(e) = page.close().await {
            tracing::debug!(worker = self.id, "Failed to close page: {}", e);
        }

        let html = result?;
        let description = extract_description(
            &html,
            &self.adapter.detail.description,
            self.adapter.detail.fallback.as_ref(),
        );
        if description.is_empty() {
            return Err(detail_failure("no description on page".to_string()));
        }
        Ok(description)
    }

    async fn read_page(&self, page: &mut dyn BrowserPage, url: &str) -> Result<String, TrawlError> {
        page.navigate(url, self.config.detail_timeout())
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TrawlError::NavigationTimeout {
                        url: url.to_string(),
                    }
                } else {
                    TrawlError::DetailFetch {
                        url: url.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        if let Some(ready) = &self.adapter.detail.ready {
            if let Err(e) = page.wait_for_selector(ready, self.config.detail_timeout()).await {
                tracing::debug!(worker = self.id, url, "Detail page not ready: {}", e);
            }
        }

        page.content().await.map_err(|e| TrawlError::DetailFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
