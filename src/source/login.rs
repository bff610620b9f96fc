//! Best-effort login procedures
//!
//! A login is a short script of browser steps. Credentials never live in the
//! configuration: `fill` steps name the environment variable holding the value.

use crate::browser::BrowserPage;
use crate::TrawlError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

fn default_step_timeout_ms() -> u64 {
    5_000
}

/// Result of the login phase of a crawl session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The adapter has no login procedure
    Skipped,
    Authenticated,
    /// Login failed; the crawl continued anonymously
    Failed(String),
}

/// One action of a login procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum LoginStep {
    /// Load a page, relative to the adapter's base URL
    Navigate { url: String },
    /// Click the first selector that can be clicked
    Click { selectors: Vec<String> },
    /// Click the first element matching `selector` whose text contains one of `texts`
    ClickText { selector: String, texts: Vec<String> },
    WaitFor { selector: String },
    /// Type the value of environment variable `env` into `selector`
    Fill { selector: String, env: String },
    Pause { millis: u64 },
}

/// An ordered list of login steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginProcedure {
    pub steps: Vec<LoginStep>,

    /// Timeout for each click and wait step
    #[serde(default = "default_step_timeout_ms", rename = "step-timeout-ms")]
    pub step_timeout_ms: u64,
}

impl LoginProcedure {
    /// Runs every step in order, stopping at the first failure
    pub async fn run(
        &self,
        page: &mut dyn BrowserPage,
        source_name: &str,
        base: &Url,
        navigation_timeout: Duration,
    ) -> Result<(), TrawlError> {
        let failure = |reason: String| TrawlError::LoginFailure {
            source_name: source_name.to_string(),
            reason,
        };
        let step_timeout = Duration::from_millis(self.step_timeout_ms);

        for (index, step) in self.steps.iter().enumerate() {
            tracing::debug!(source = source_name, step = index, "Login step {:?}", step_kind(step));
            match step {
                LoginStep::Navigate { url } => {
                    let target = base
                        .join(url)
                        .map_err(|e| failure(format!("bad login URL {}: {}", url, e)))?;
                    page.navigate(target.as_str(), navigation_timeout)
                        .await
                        .map_err(|e| failure(e.to_string()))?;
                }
                LoginStep::Click { selectors } => {
                    let mut last_error = None;
                    let mut clicked = false;
                    for selector in selectors {
                        match page.click(selector, step_timeout).await {
                            Ok(()) => {
                                clicked = true;
                                break;
                            }
                            Err(e) => last_error = Some(e.to_string()),
                        }
                    }
                    if !clicked {
                        return Err(failure(
                            last_error.unwrap_or_else(|| "no selectors to click".to_string()),
                        ));
                    }
                }
                LoginStep::ClickText { selector, texts } => {
                    let script = click_text_script(selector, texts);
                    let clicked = page
                        .evaluate(&script)
                        .await
                        .map_err(|e| failure(e.to_string()))?;
                    if clicked != serde_json::Value::Bool(true) {
                        return Err(failure(format!(
                            "no {} containing any of {:?}",
                            selector, texts
                        )));
                    }
                }
                LoginStep::WaitFor { selector } => {
                    page.wait_for_selector(selector, step_timeout)
                        .await
                        .map_err(|e| failure(e.to_string()))?;
                }
                LoginStep::Fill { selector, env } => {
                    let value = std::env::var(env)
                        .map_err(|_| failure(format!("{} is not set", env)))?;
                    page.fill(selector, &value)
                        .await
                        .map_err(|e| failure(e.to_string()))?;
                }
                LoginStep::Pause { millis } => {
                    tokio::time::sleep(Duration::from_millis(*millis)).await;
                }
            }
        }

        Ok(())
    }
}

fn step_kind(step: &LoginStep) -> &'static str {
    match step {
        LoginStep::Navigate { .. } => "navigate",
        LoginStep::Click { .. } => "click",
        LoginStep::ClickText { .. } => "click-text",
        LoginStep::WaitFor { .. } => "wait-for",
        LoginStep::Fill { .. } => "fill",
        LoginStep::Pause { .. } => "pause",
    }
}

/// Script clicking the first `selector` match whose text contains one of `texts`
fn click_text_script(selector: &str, texts: &[String]) -> String {
    // JSON string literals are valid JavaScript literals
    let selector = serde_json::Value::String(selector.to_string());
    let texts = serde_json::json!(texts);
    format!(
        "(() => {{ const texts = {texts}; \
         for (const el of document.querySelectorAll({selector})) {{ \
           const text = (el.innerText || el.textContent || '').trim(); \
           if (texts.some((t) => text.includes(t))) {{ el.click(); return true; }} \
         }} \
         return false; }})()"
    )
}
