//! Static-DOM HTTP driver
//!
//! This driver satisfies the browser traits with plain HTTP requests:
//! - Navigation is a GET whose body becomes the page's document
//! - Queries run against that document with CSS selectors
//! - Clicks on links follow their `href`
//! - Scripts, form filling and scrolling are unavailable
//!
//! Server-rendered search pages work fully; infinite-scroll sources end after
//! their first pass because the document never grows.

use crate::browser::{
    find_link, select_outer_html, BrowserError, BrowserLauncher, BrowserPage, BrowserSession,
};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Launches `HttpBrowser` sessions
pub struct HttpLauncher {
    config: BrowserConfig,
}

impl HttpLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>, BrowserError> {
        let browser = HttpBrowser::new(&self.config)?;
        Ok(Arc::new(browser))
    }
}

/// A browser session backed by one shared HTTP client
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    /// Builds an HTTP client with the configured user agent
    ///
    /// # Example
    ///
    /// ```no_run
    /// use jobtrawl::browser::HttpBrowser;
    /// use jobtrawl::config::BrowserConfig;
    ///
    /// let browser = HttpBrowser::new(&BrowserConfig::default()).unwrap();
    /// ```
    pub fn new(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| BrowserError::Driver(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl BrowserSession for HttpBrowser {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            url: None,
            html: None,
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

/// A page holding the document of its last navigation
pub struct HttpPage {
    client: Client,
    url: Option<Url>,
    html: Option<String>,
}

impl HttpPage {
    fn document(&self) -> Result<&str, BrowserError> {
        self.html.as_deref().ok_or(BrowserError::NoDocument)
    }
}

#[async_trait]
impl BrowserPage for HttpPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, url, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrowserError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(e, url, timeout))?;

        tracing::trace!("Loaded {} ({} bytes)", final_url, body.len());
        self.url = Some(final_url);
        self.html = Some(body);
        Ok(())
    }

    async fn query_all(&mut self, selector: &str) -> Result<Vec<String>, BrowserError> {
        select_outer_html(self.document()?, selector)
    }

    async fn evaluate(&mut self, _script: &str) -> Result<serde_json::Value, BrowserError> {
        Err(BrowserError::Unsupported("script evaluation"))
    }

    async fn click(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let base = self.url.clone().ok_or(BrowserError::NoDocument)?;
        let target = find_link(self.document()?, selector, &base)?;
        self.navigate(target.as_str(), timeout).await
    }

    async fn fill(&mut self, _selector: &str, _value: &str) -> Result<(), BrowserError> {
        Err(BrowserError::Unsupported("form input"))
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.document().map(str::to_string)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.html = None;
        self.url = None;
        Ok(())
    }

    /// A static document is either rendered or not; there is nothing to wait for
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        if select_outer_html(self.document()?, selector)?.is_empty() {
            return Err(BrowserError::Timeout {
                operation: format!("wait for {}", selector),
                timeout,
            });
        }
        Ok(())
    }

    async fn scroll_height(&mut self) -> Result<u64, BrowserError> {
        Ok(self.document()?.len() as u64)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }
}

/// Maps a reqwest failure onto the driver error taxonomy
fn classify_error(error: reqwest::Error, url: &str, timeout: Duration) -> BrowserError {
    if error.is_timeout() {
        BrowserError::Timeout {
            operation: format!("navigate to {}", url),
            timeout,
        }
    } else if error.is_connect() {
        BrowserError::Navigation {
            url: url.to_string(),
            reason: "Connection refused".to_string(),
        }
    } else {
        BrowserError::Navigation {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}
