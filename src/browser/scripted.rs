//! In-memory browser used by unit tests
//!
//! Routes map exact URLs to canned documents. A `Feed` route grows by one
//! stage per scroll so infinite-scroll behavior can be scripted. A `Delayed`
//! route keeps the previous document visible for a while, like a page that
//! swaps its results in after the click has returned.

use crate::browser::{
    find_link, select_outer_html, BrowserError, BrowserLauncher, BrowserPage, BrowserSession,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

#[derive(Debug, Clone)]
pub(crate) enum Route {
    /// A static document
    Page(String),
    /// Documents revealed one per scroll; the last stage never grows
    Feed(Vec<String>),
    /// A document that replaces the current one only after the delay
    Delayed(Duration, String),
    /// Never answers; navigation runs into its timeout
    Hang,
    /// Fails immediately
    Fail,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ScriptLog {
    pub navigations: Vec<String>,
    pub scrolls: usize,
    pub pages_opened: usize,
    pub pages_closed: usize,
    pub fills: Vec<(String, String)>,
    pub scripts: Vec<String>,
    pub session_closed: bool,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedBrowser {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    log: Arc<Mutex<ScriptLog>>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, route: Route) {
        self.routes.lock().unwrap().insert(url.to_string(), route);
    }

    pub fn log(&self) -> ScriptLog {
        self.log.lock().unwrap().clone()
    }

    pub fn launcher(&self) -> Arc<dyn BrowserLauncher> {
        Arc::new(ScriptedLauncher {
            browser: Some(self.clone()),
        })
    }

    /// A launcher whose browser never starts
    pub fn broken_launcher() -> Arc<dyn BrowserLauncher> {
        Arc::new(ScriptedLauncher { browser: None })
    }

    pub fn page(&self) -> ScriptedPage {
        self.log.lock().unwrap().pages_opened += 1;
        ScriptedPage {
            browser: self.clone(),
            url: None,
            feed: Vec::new(),
            stage: 0,
            html: None,
            pending: None,
        }
    }
}

pub(crate) struct ScriptedLauncher {
    browser: Option<ScriptedBrowser>,
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserSession>, BrowserError> {
        match &self.browser {
            Some(browser) => Ok(Arc::new(browser.clone())),
            None => Err(BrowserError::Driver("no browser binary".to_string())),
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedBrowser {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        Ok(Box::new(self.page()))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.log.lock().unwrap().session_closed = true;
        Ok(())
    }
}

pub(crate) struct ScriptedPage {
    browser: ScriptedBrowser,
    url: Option<Url>,
    feed: Vec<String>,
    stage: usize,
    html: Option<String>,
    pending: Option<(Instant, String)>,
}

impl ScriptedPage {
    fn document(&mut self) -> Result<&str, BrowserError> {
        if self
            .pending
            .as_ref()
            .is_some_and(|(ready_at, _)| Instant::now() >= *ready_at)
        {
            self.html = self.pending.take().map(|(_, html)| html);
        }
        self.html.as_deref().ok_or(BrowserError::NoDocument)
    }
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.browser
            .log
            .lock()
            .unwrap()
            .navigations
            .push(url.to_string());

        let route = self.browser.routes.lock().unwrap().get(url).cloned();
        self.pending = None;
        match route {
            Some(Route::Page(html)) => {
                self.feed.clear();
                self.html = Some(html);
            }
            Some(Route::Delayed(delay, html)) => {
                self.feed.clear();
                self.pending = Some((Instant::now() + delay, html));
            }
            Some(Route::Feed(stages)) => {
                self.stage = 0;
                self.html = stages.first().cloned();
                self.feed = stages;
            }
            Some(Route::Hang) => {
                tokio::time::sleep(timeout).await;
                return Err(BrowserError::Timeout {
                    operation: format!("navigate to {}", url),
                    timeout,
                });
            }
            Some(Route::Fail) => {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: "scripted failure".to_string(),
                })
            }
            None => {
                return Err(BrowserError::Http {
                    url: url.to_string(),
                    status: 404,
                })
            }
        }

        self.url = Url::parse(url).ok();
        Ok(())
    }

    async fn query_all(&mut self, selector: &str) -> Result<Vec<String>, BrowserError> {
        select_outer_html(self.document()?, selector)
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, BrowserError> {
        self.browser
            .log
            .lock()
            .unwrap()
            .scripts
            .push(script.to_string());
        Ok(serde_json::Value::Bool(true))
    }

    async fn click(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let base = self.url.clone().ok_or(BrowserError::NoDocument)?;
        match find_link(self.document()?, selector, &base) {
            Ok(target) => self.navigate(target.as_str(), timeout).await,
            // Buttons without href just register the click
            Err(BrowserError::Unsupported(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), BrowserError> {
        if select_outer_html(self.document()?, selector)?.is_empty() {
            return Err(BrowserError::SelectorNotFound {
                selector: selector.to_string(),
            });
        }
        self.browser
            .log
            .lock()
            .unwrap()
            .fills
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.document().map(str::to_string)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.browser.log.lock().unwrap().pages_closed += 1;
        Ok(())
    }

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
        Ok((self.stage as u64 + 1) * 1000)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.browser.log.lock().unwrap().scrolls += 1;
        if self.stage + 1 < self.feed.len() {
            self.stage += 1;
            self.html = Some(self.feed[self.stage].clone());
        }
        Ok(())
    }
}
