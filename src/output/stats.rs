//! Run statistics
//!
//! This module condenses the per-source crawl reports into totals and
//! prints them after a run.

use crate::crawler::{CrawlReport, SourceOutcome, Termination};
use crate::source::LoginOutcome;
use std::collections::BTreeMap;
use std::time::Duration;

/// Statistics of one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatistics {
    pub source: String,
    /// `None` when the browser could not be launched
    pub login: Option<LoginOutcome>,
    pub queries: usize,
    pub emitted: usize,
    pub duplicates: usize,
    pub enriched: usize,
    pub placeholder: usize,
    pub collected: usize,
    pub elapsed: Duration,
    /// Error message for a source that produced nothing
    pub error: Option<String>,
}

impl SourceStatistics {
    fn from_report(report: &CrawlReport) -> Self {
        Self {
            source: report.source.clone(),
            login: Some(report.login.clone()),
            queries: report.queries.len(),
            emitted: report.emitted(),
            duplicates: report.duplicates(),
            enriched: report.enrichment.enriched,
            placeholder: report.enrichment.placeholder,
            collected: report.collected,
            elapsed: report.elapsed,
            error: None,
        }
    }

    fn failed(source: &str, error: String) -> Self {
        Self {
            source: source.to_string(),
            login: None,
            queries: 0,
            emitted: 0,
            duplicates: 0,
            enriched: 0,
            placeholder: 0,
            collected: 0,
            elapsed: Duration::ZERO,
            error: Some(error),
        }
    }
}

/// Totals over every source of a run
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub sources: Vec<SourceStatistics>,

    /// How many queries ended for each reason, keyed by the reason label
    pub terminations: BTreeMap<String, usize>,

    /// Rows written to the job store, once known
    pub saved: Option<usize>,
}

impl RunStatistics {
    /// Builds statistics from the outcomes of `scrape_all`
    pub fn from_outcomes(outcomes: &[SourceOutcome]) -> Self {
        let mut stats = Self::default();

        for outcome in outcomes {
            match &outcome.result {
                Ok(output) => {
                    stats
                        .sources
                        .push(SourceStatistics::from_report(&output.report));
                    for query in &output.report.queries {
                        *stats
                            .terminations
                            .entry(termination_label(&query.termination))
                            .or_insert(0) += 1;
                    }
                }
                Err(e) => stats
                    .sources
                    .push(SourceStatistics::failed(&outcome.source, e.to_string())),
            }
        }

        stats
    }

    pub fn total_collected(&self) -> usize {
        self.sources.iter().map(|s| s.collected).sum()
    }

    pub fn total_enriched(&self) -> usize {
        self.sources.iter().map(|s| s.enriched).sum()
    }

    pub fn total_placeholder(&self) -> usize {
        self.sources.iter().map(|s| s.placeholder).sum()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }

    /// Share of processed records that received a real description, in percent
    pub fn enrichment_rate(&self) -> f64 {
        let processed = self.total_enriched() + self.total_placeholder();
        if processed == 0 {
            0.0
        } else {
            (self.total_enriched() as f64 / processed as f64) * 100.0
        }
    }
}

/// Reason label without the free-form failure text, for grouping
fn termination_label(termination: &Termination) -> String {
    match termination {
        Termination::Failed(_) => "failed".to_string(),
        other => other.to_string(),
    }
}

fn login_label(login: &Option<LoginOutcome>) -> String {
    match login {
        None => "-".to_string(),
        Some(LoginOutcome::Skipped) => "skipped".to_string(),
        Some(LoginOutcome::Authenticated) => "authenticated".to_string(),
        Some(LoginOutcome::Failed(reason)) => format!("failed ({})", reason),
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Sources: {}", stats.sources.len());
    println!("  Failed sources: {}", stats.failed_sources());
    println!("  Jobs collected: {}", stats.total_collected());
    if let Some(saved) = stats.saved {
        println!("  Rows saved: {}", saved);
    }
    println!(
        "  Enrichment: {:.1}% ({} with description, {} placeholder)",
        stats.enrichment_rate(),
        stats.total_enriched(),
        stats.total_placeholder()
    );
    println!();

    println!("Sources:");
    for source in &stats.sources {
        match &source.error {
            Some(error) => println!("  {}: FAILED ({})", source.source, error),
            None => println!(
                "  {}: {} jobs from {} queries, {} duplicates, login {}, {:.1}s",
                source.source,
                source.collected,
                source.queries,
                source.duplicates,
                login_label(&source.login),
                source.elapsed.as_secs_f64()
            ),
        }
    }
    println!();

    if !stats.terminations.is_empty() {
        println!("Query Terminations:");
        let mut counts: Vec<_> = stats.terminations.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1));

        for (reason, count) in counts {
            println!("  {}: {}", reason, count);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlOutput, PoolStats, SearchQuery, TraversalReport};
    use crate::TrawlError;

    fn query_report(termination: Termination, emitted: usize) -> TraversalReport {
        TraversalReport {
            query: SearchQuery {
                title: "rust".to_string(),
                location: "remote".to_string(),
            },
            harvested: emitted,
            emitted,
            duplicates: 1,
            passes: 2,
            termination,
        }
    }

    fn outcome(source: &str) -> SourceOutcome {
        SourceOutcome {
            source: source.to_string(),
            result: Ok(CrawlOutput {
                records: vec![],
                report: CrawlReport {
                    source: source.to_string(),
                    login: LoginOutcome::Skipped,
                    queries: vec![
                        query_report(Termination::QuotaReached, 5),
                        query_report(Termination::Failed("timeout".to_string()), 3),
                    ],
                    enrichment: PoolStats {
                        enriched: 6,
                        placeholder: 2,
                    },
                    collected: 8,
                    elapsed: Duration::from_secs(3),
                },
            }),
        }
    }

    #[test]
    fn test_statistics_from_outcomes() {
        let outcomes = vec![
            outcome("Indeed"),
            SourceOutcome {
                source: "LinkedIn".to_string(),
                result: Err(TrawlError::BrowserLaunch("no chrome".to_string())),
            },
        ];

        let stats = RunStatistics::from_outcomes(&outcomes);

        assert_eq!(stats.sources.len(), 2);
        assert_eq!(stats.failed_sources(), 1);
        assert_eq!(stats.total_collected(), 8);
        assert_eq!(stats.sources[0].emitted, 8);
        assert_eq!(stats.sources[0].duplicates, 2);
        assert_eq!(stats.terminations.get("quota reached"), Some(&1));
        assert_eq!(stats.terminations.get("failed"), Some(&1));
        assert!((stats.enrichment_rate() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_enrichment_rate_without_records() {
        let stats = RunStatistics::default();
        assert_eq!(stats.enrichment_rate(), 0.0);
    }
}
