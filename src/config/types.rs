use crate::source::SourceAdapter;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for jobtrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Preset or custom source names to run
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    pub search: SearchConfig,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    pub output: OutputConfig,

    /// Adapter definitions beyond the built-in presets
    #[serde(default, rename = "custom-source")]
    pub custom_source: Vec<SourceAdapter>,
}

fn default_sources() -> Vec<String> {
    crate::source::PRESET_NAMES
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// What to search for
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Job titles, searched in order
    pub titles: Vec<String>,

    /// Locations, combined with every title
    pub locations: Vec<String>,

    /// Restrict results to remote positions
    #[serde(default, rename = "remote-only")]
    pub remote_only: bool,

    /// Overall record limit per source
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Crawl engine tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent detail workers
    pub workers: usize,

    /// Timeout for loading a search page (milliseconds)
    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    /// Timeout for the result container to appear (milliseconds)
    #[serde(rename = "results-timeout-ms")]
    pub results_timeout_ms: u64,

    /// Timeout for loading a detail page (milliseconds)
    #[serde(rename = "detail-timeout-ms")]
    pub detail_timeout_ms: u64,

    /// Delay after each scroll before the page height is measured (milliseconds)
    #[serde(rename = "scroll-settle-ms")]
    pub scroll_settle_ms: u64,

    /// Upper bound on harvest passes for one query
    #[serde(rename = "max-passes")]
    pub max_passes: usize,

    /// Capacity of the work queue between traversal and workers
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: usize,

    /// Per-query quota when no overall limit is set
    #[serde(rename = "default-query-quota")]
    pub default_query_quota: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            navigation_timeout_ms: 60_000,
            results_timeout_ms: 10_000,
            detail_timeout_ms: 60_000,
            scroll_settle_ms: 2_000,
            max_passes: 50,
            queue_capacity: 256,
            default_query_quota: 100,
        }
    }
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn results_timeout(&self) -> Duration {
        Duration::from_millis(self.results_timeout_ms)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_timeout_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    /// Records accepted per (title, location) query
    ///
    /// The limit is split evenly across titles; locations do not divide it
    /// further. A configured limit always leaves room for one record per query.
    pub fn query_quota(&self, limit: Option<usize>, title_count: usize) -> usize {
        match limit {
            Some(limit) => (limit / title_count.max(1)).max(1),
            None => self.default_query_quota,
        }
    }
}

/// Which browser driver runs the crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserDriver {
    /// Static DOM fetched over HTTP
    #[default]
    Http,
    /// Headless Chrome over CDP
    Chromium,
}

/// Browser driver configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub driver: BrowserDriver,

    pub headless: bool,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Upper bound on a single driver call such as a query or a click (milliseconds)
    #[serde(rename = "operation-timeout-ms")]
    pub operation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            driver: BrowserDriver::Http,
            headless: true,
            user_agent: format!(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/126.0 Safari/537.36 jobtrawl/{}",
                env!("CARGO_PKG_VERSION")
            ),
            operation_timeout_ms: 30_000,
        }
    }
}

impl BrowserConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown digest, if one should be written
    #[serde(default, rename = "summary-path")]
    pub summary_path: Option<String>,
}

impl Config {
    /// Resolves the configured source names to adapters
    ///
    /// Custom sources shadow presets of the same name.
    pub fn adapters(&self) -> Result<Vec<SourceAdapter>, crate::ConfigError> {
        self.sources
            .iter()
            .map(|name| {
                self.custom_source
                    .iter()
                    .find(|custom| custom.name.eq_ignore_ascii_case(name))
                    .cloned()
                    .or_else(|| crate::source::preset(name))
                    .ok_or_else(|| crate::ConfigError::UnknownSource(name.clone()))
            })
            .collect()
    }
}
