//! Headless Chrome driver over the DevTools protocol

use crate::browser::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Launches a local Chrome/Chromium binary
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>, BrowserError> {
        let mut builder = CdpConfig::builder().arg(format!("--user-agent={}", self.config.user_agent));
        if !self.config.headless {
            builder = builder.with_head();
        }
        let cdp_config = builder.build().map_err(BrowserError::Driver)?;

        let timeout = self.config.operation_timeout();
        let (browser, mut handler) =
            bounded("launch chromium".to_string(), timeout, Browser::launch(cdp_config)).await?;

        // The handler must be polled for the browser to make progress
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler stopped: {}", e);
                    break;
                }
            }
        });

        tracing::info!(headless = self.config.headless, "Chromium launched");
        Ok(Arc::new(ChromiumSession {
            browser: Mutex::new(Some(browser)),
            events,
            timeout,
        }))
    }
}

struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    events: JoinHandle<()>,
    /// Bound on every CDP round trip
    timeout: Duration,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let guard = self.browser.lock().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| BrowserError::Driver("browser already closed".to_string()))?;
        let page = bounded(
            "open page".to_string(),
            self.timeout,
            browser.new_page("about:blank"),
        )
        .await?;
        Ok(Box::new(ChromiumPage {
            page: Some(page),
            timeout: self.timeout,
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        let result = bounded("close browser".to_string(), self.timeout, browser.close()).await;
        if let Err(e) = bounded("wait for browser exit".to_string(), self.timeout, browser.wait()).await {
            tracing::debug!("Chromium did not exit cleanly: {}", e);
        }
        self.events.abort();
        result.map(|_| ())
    }
}

struct ChromiumPage {
    page: Option<Page>,
    timeout: Duration,
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::NoDocument)
    }

    async fn find(&self, selector: &str) -> Result<Element, BrowserError> {
        let page = self.page()?;
        match bounded(format!("find {}", selector), self.timeout, page.find_element(selector)).await {
            Ok(element) => Ok(element),
            Err(e) if e.is_timeout() => Err(e),
            Err(_) => Err(BrowserError::SelectorNotFound {
                selector: selector.to_string(),
            }),
        }
    }
}

async fn bounded<T, E, F>(operation: String, timeout: Duration, fut: F) -> Result<T, BrowserError>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(BrowserError::Driver(format!("{}: {}", operation, e))),
        Err(_) => Err(BrowserError::Timeout { operation, timeout }),
    }
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let page = self.page()?;
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(BrowserError::Timeout {
                operation: format!("navigate to {}", url),
                timeout,
            }),
        }
    }

    async fn query_all(&mut self, selector: &str) -> Result<Vec<String>, BrowserError> {
        let page = self.page()?;
        let elements =
            match bounded(format!("query {}", selector), self.timeout, page.find_elements(selector)).await {
                Ok(elements) => elements,
                Err(e) if e.is_timeout() => return Err(e),
                // CDP reports an empty match as an error
                Err(_) => return Ok(Vec::new()),
            };

        let mut found = Vec::with_capacity(elements.len());
        for element in elements {
            match bounded(format!("read {}", selector), self.timeout, element.outer_html()).await {
                Ok(Some(html)) => found.push(html),
                Ok(None) => {}
                Err(e) if e.is_timeout() => return Err(e),
                Err(e) => tracing::trace!("Skipping detached element: {}", e),
            }
        }
        Ok(found)
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let page = self.page()?;
        let result = bounded("evaluate script".to_string(), self.timeout, page.evaluate(script)).await?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn click(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let element = self.find(selector).await?;
        let page = self.page()?;
        bounded(format!("click {}", selector), timeout, async {
            element.click().await?;
            // Resolves at once when the click did not start a navigation
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let element = self.find(selector).await?;
        bounded(format!("fill {}", selector), self.timeout, async {
            element.click().await?;
            element.type_str(value).await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        let page = self.page()?;
        bounded("read content".to_string(), self.timeout, page.content()).await
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        match self.page.take() {
            Some(page) => bounded("close page".to_string(), self.timeout, page.close()).await,
            None => Ok(()),
        }
    }
}
