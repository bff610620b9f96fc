//! Browser automation collaborator
//!
//! The crawl engine only talks to these traits:
//! - `BrowserLauncher` acquires one browser session per crawl
//! - `BrowserSession` hands out isolated pages (tabs)
//! - `BrowserPage` navigates, waits, queries and scrolls one page
//!
//! Two drivers ship with the crate: the static-DOM `HttpBrowser` and, behind the
//! `chromium` feature, a CDP-driven headless Chrome.

#[cfg(feature = "chromium")]
mod chromium;
mod http;
#[cfg(test)]
pub(crate) mod scripted;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumLauncher;
pub use http::{HttpBrowser, HttpLauncher};

use crate::config::{BrowserConfig, BrowserDriver};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Interval between polls while waiting for a selector
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors raised by a browser driver
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Timed out after {timeout:?} during {operation}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("No element matches selector {selector}")]
    SelectorNotFound { selector: String },

    #[error("No page loaded")]
    NoDocument,

    #[error("Operation not supported by this driver: {0}")]
    Unsupported(&'static str),

    #[error("Driver error: {0}")]
    Driver(String),
}

impl BrowserError {
    /// Returns true for errors caused by a bounded wait running out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Acquires a browser session
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>, BrowserError>;
}

/// One running browser, shared by the listing traversal and the detail workers
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Opens a new page in its own browsing context
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;

    /// Releases the browser
    async fn close(&self) -> Result<(), BrowserError>;
}

/// One page (tab) of a browser session
#[async_trait]
pub trait BrowserPage: Send {
    /// Loads `url`, failing with a timeout error after `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Returns the outer HTML of every element matching `selector`
    async fn query_all(&mut self, selector: &str) -> Result<Vec<String>, BrowserError>;

    /// Evaluates a script in the page and returns its JSON result
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// Clicks the first element matching `selector`
    async fn click(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Types `value` into the first element matching `selector`
    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), BrowserError>;

    /// Returns the page's current HTML
    async fn content(&mut self) -> Result<String, BrowserError>;

    /// Releases the page
    async fn close(&mut self) -> Result<(), BrowserError>;

    /// Waits until at least one element matches `selector`
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(found) = self.query_all(selector).await {
                if !found.is_empty() {
                    return Ok(());
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    operation: format!("wait for {}", selector),
                    timeout,
                });
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    /// Current height of the scrollable document
    async fn scroll_height(&mut self) -> Result<u64, BrowserError> {
        let value = self.evaluate("document.body.scrollHeight").await?;
        value
            .as_u64()
            .or_else(|| value.as_f64().map(|h| h as u64))
            .ok_or_else(|| BrowserError::Driver(format!("unexpected scroll height {}", value)))
    }

    /// Scrolls to the bottom of the document
    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map(|_| ())
    }
}

/// Builds the launcher selected by the browser configuration
pub fn launcher_for(config: &BrowserConfig) -> Result<Arc<dyn BrowserLauncher>, BrowserError> {
    match config.driver {
        BrowserDriver::Http => Ok(Arc::new(HttpLauncher::new(config.clone()))),
        #[cfg(feature = "chromium")]
        BrowserDriver::Chromium => Ok(Arc::new(ChromiumLauncher::new(config.clone()))),
        #[cfg(not(feature = "chromium"))]
        BrowserDriver::Chromium => Err(BrowserError::Unsupported(
            "chromium driver requires the `chromium` feature",
        )),
    }
}

/// Outer HTML of every element in `html` matching `selector`
///
/// Shared by drivers that hold a static copy of the document.
pub(crate) fn select_outer_html(html: &str, selector: &str) -> Result<Vec<String>, BrowserError> {
    let parsed = Selector::parse(selector).map_err(|_| BrowserError::SelectorNotFound {
        selector: selector.to_string(),
    })?;
    let document = Html::parse_document(html);
    Ok(document.select(&parsed).map(|el| el.html()).collect())
}

/// Resolves the `href` of the first element matching `selector`
///
/// Used to emulate clicks on links in a static document.
pub(crate) fn find_link(html: &str, selector: &str, base: &Url) -> Result<Url, BrowserError> {
    let not_found = || BrowserError::SelectorNotFound {
        selector: selector.to_string(),
    };
    let parsed = Selector::parse(selector).map_err(|_| not_found())?;
    let document = Html::parse_document(html);
    let element = document.select(&parsed).next().ok_or_else(not_found)?;
    let href = element
        .value()
        .attr("href")
        .ok_or(BrowserError::Unsupported("click on an element without href"))?;
    base.join(href)
        .map_err(|e| BrowserError::Driver(format!("bad href {}: {}", href, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <ul><li class="job">A</li><li class="job">B</li></ul>
        <a class="next" href="/search?page=2">Next</a>
        <span class="dead">No link</span>
    </body></html>"#;

    #[test]
    fn test_select_outer_html() {
        let found = select_outer_html(PAGE, "li.job").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].contains(">A<"));
    }

    #[test]
    fn test_select_invalid_selector() {
        assert!(select_outer_html(PAGE, "li:has-text('A')").is_err());
    }

    #[test]
    fn test_find_link_resolves_relative_href() {
        let base = Url::parse("https://jobs.example.com/search?page=1").unwrap();
        let url = find_link(PAGE, "a.next", &base).unwrap();
        assert_eq!(url.as_str(), "https://jobs.example.com/search?page=2");
    }

    #[test]
    fn test_find_link_errors() {
        let base = Url::parse("https://jobs.example.com/").unwrap();
        assert!(matches!(
            find_link(PAGE, "a.prev", &base),
            Err(BrowserError::SelectorNotFound { .. })
        ));
        assert!(matches!(
            find_link(PAGE, "span.dead", &base),
            Err(BrowserError::Unsupported(_))
        ));
    }
}
