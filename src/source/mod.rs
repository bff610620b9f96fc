//! Data-driven source adapters
//!
//! A job site is described entirely by a [`SourceAdapter`] record: how to build
//! its search URL, which selectors locate result cards and their fields, how the
//! result list advances, how detail pages are read and an optional login
//! procedure. The crawl engine runs any adapter without site-specific code.
//!
//! Adapters are plain serde data, so new sites can be declared in the TOML
//! configuration next to the built-in [`presets`].

mod login;
mod presets;

pub use login::{LoginOutcome, LoginProcedure, LoginStep};
pub use presets::{glints, indeed, linkedin, preset, PRESET_NAMES};

use crate::extract::{ContentSlice, Locator};
use crate::state::JobSource;
use crate::UrlError;
use serde::{Deserialize, Serialize};
use url::Url;

fn default_splitter() -> String {
    "+".to_string()
}

/// Static per-site descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAdapter {
    /// Site name; also the record's `source`
    pub name: String,

    /// Site root, used to resolve relative links
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Search URL template with `{title}`, `{location}` and `{remote}` placeholders
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// Separator placed between the encoded words of a search term
    #[serde(default = "default_splitter", rename = "search-splitter")]
    pub search_splitter: String,

    /// Substituted for `{remote}` when only remote jobs are wanted
    #[serde(default, rename = "remote-filter")]
    pub remote_filter: String,

    /// Drop the whole query string from job URLs
    #[serde(default, rename = "strip-query")]
    pub strip_query: bool,

    pub listing: ListingSelectors,

    pub pagination: Pagination,

    #[serde(default)]
    pub detail: DetailSelectors,

    #[serde(default)]
    pub login: Option<LoginProcedure>,
}

/// Selectors for the search-results view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Element whose appearance means results have rendered
    #[serde(rename = "results-ready")]
    pub results_ready: String,

    /// Result card selectors; the first one matching anything is used
    #[serde(rename = "result-item")]
    pub result_item: Vec<String>,

    pub link: Vec<Locator>,

    pub title: Vec<Locator>,

    pub company: Vec<Locator>,

    pub location: Vec<Locator>,

    #[serde(default, rename = "date-posted")]
    pub date_posted: Vec<Locator>,
}

/// How a result list reveals more results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Pagination {
    /// A "next" control loads the following page
    NextButton { selector: String },
    /// Scrolling to the bottom appends more cards
    InfiniteScroll,
}

/// How a detail page is read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailSelectors {
    /// Optional element to wait for before reading the page
    #[serde(default)]
    pub ready: Option<String>,

    #[serde(default)]
    pub description: Vec<Locator>,

    /// Main-content slice used when no description locator matches
    #[serde(default)]
    pub fallback: Option<ContentSlice>,
}

impl SourceAdapter {
    pub fn source(&self) -> JobSource {
        JobSource::from_name(&self.name)
    }

    pub fn base(&self) -> Result<Url, UrlError> {
        Url::parse(&self.base_url).map_err(|e| UrlError::Parse(e.to_string()))
    }

    /// Builds the search URL for one query
    ///
    /// # Example
    ///
    /// ```
    /// use jobtrawl::source::indeed;
    ///
    /// let url = indeed().build_search_url("rust engineer", "Berlin", false).unwrap();
    /// assert_eq!(url.as_str(), "https://www.indeed.com/jobs?q=rust+engineer&l=Berlin");
    /// ```
    pub fn build_search_url(
        &self,
        title: &str,
        location: &str,
        remote_only: bool,
    ) -> Result<Url, UrlError> {
        let remote = if remote_only {
            self.remote_filter.as_str()
        } else {
            ""
        };
        let filled = self
            .search_url
            .replace("{title}", &self.encode_term(title))
            .replace("{location}", &self.encode_term(location))
            .replace("{remote}", remote);

        self.base()?
            .join(&filled)
            .map_err(|e| UrlError::Parse(format!("{}: {}", filled, e)))
    }

    fn encode_term(&self, term: &str) -> String {
        term.split_whitespace()
            .map(|word| url::form_urlencoded::byte_serialize(word.as_bytes()).collect::<String>())
            .collect::<Vec<_>>()
            .join(&self.search_splitter)
    }
}
