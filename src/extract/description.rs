//! Detail page description extraction
//!
//! A detail page is read with the source's description locators first. Sites
//! without a stable description container instead get a main-content slice: the
//! text of the page's main container, cut between two boilerplate headings.

use super::{element_lines, extract, Field, Locator};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

fn default_max_chars() -> usize {
    2000
}

/// Heuristic slice of a page's main content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSlice {
    /// Candidate main-content containers, tried in order
    pub containers: Vec<String>,

    /// Heading that opens the description (kept in the output)
    #[serde(default, rename = "start-marker")]
    pub start_marker: Option<String>,

    /// Heading that follows the description (cut from the output)
    #[serde(default, rename = "end-marker")]
    pub end_marker: Option<String>,

    /// Characters kept when no marker is found
    #[serde(default = "default_max_chars", rename = "max-chars")]
    pub max_chars: usize,
}

impl ContentSlice {
    /// Cuts the description out of a container's text
    ///
    /// - both markers present, in order: text from the start marker up to the end marker
    /// - end marker present: text before its first occurrence
    /// - otherwise: the first `max_chars` characters
    pub fn slice(&self, text: &str) -> String {
        if let Some(end_marker) = self.end_marker.as_deref() {
            if let Some(end) = text.find(end_marker) {
                let start = self
                    .start_marker
                    .as_deref()
                    .and_then(|marker| text.find(marker))
                    .filter(|start| *start < end)
                    .unwrap_or(0);
                return text[start..end].trim().to_string();
            }
        }

        text.chars().take(self.max_chars).collect::<String>().trim().to_string()
    }
}

/// Extracts a listing description from a detail page's HTML
///
/// Returns the empty string (the description default) when neither the
/// locators nor the content slice produce any text.
pub fn extract_description(
    html: &str,
    locators: &[Locator],
    fallback: Option<&ContentSlice>,
) -> String {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let description = extract(root, locators, Field::Description);
    if !description.is_empty() {
        return description;
    }

    let Some(slice) = fallback else {
        return description;
    };

    let container = slice.containers.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document.select(&selector).next()
    });

    match container {
        Some(container) => slice.slice(&element_lines(container).join("\n")),
        None => {
            tracing::trace!("No main content container matched");
            Field::Description.default_value().to_string()
        }
    }
}
