//! Field extraction with fallback locator chains
//!
//! Job sites regenerate their class names often, so every field is described by
//! an ordered list of candidate locators. The first locator that yields
//! non-empty text wins; when all of them miss the field gets a fixed default.
//! Lookup failures (missing nodes, unparsable selectors) count as misses and
//! never surface as errors.

mod description;

pub use description::{extract_description, ContentSlice};

use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};

/// What to read from the node a locator resolves to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Read {
    /// Whitespace-collapsed text content
    #[default]
    Text,
    /// The first non-empty line of the text content
    FirstLine,
    /// Multi-line text content, one trimmed line per text block
    Block,
    /// The trimmed value of an attribute
    Attr(String),
}

/// One candidate strategy for locating a field inside a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// CSS selector relative to the node; `None` targets the node itself
    #[serde(default)]
    pub selector: Option<String>,

    #[serde(default)]
    pub read: Read,
}

impl Locator {
    /// Text content of the first descendant matching `selector`
    pub fn text(selector: &str) -> Self {
        Self {
            selector: Some(selector.to_string()),
            read: Read::Text,
        }
    }

    /// Attribute of the first descendant matching `selector`
    pub fn attr(selector: &str, name: &str) -> Self {
        Self {
            selector: Some(selector.to_string()),
            read: Read::Attr(name.to_string()),
        }
    }

    /// Multi-line text of the first descendant matching `selector`
    pub fn block(selector: &str) -> Self {
        Self {
            selector: Some(selector.to_string()),
            read: Read::Block,
        }
    }

    /// Attribute of the node itself
    pub fn own_attr(name: &str) -> Self {
        Self {
            selector: None,
            read: Read::Attr(name.to_string()),
        }
    }

    /// First line of the node's own text
    pub fn own_first_line() -> Self {
        Self {
            selector: None,
            read: Read::FirstLine,
        }
    }
}

/// The record fields the extractor fills, each with its documented default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Company,
    Location,
    DatePosted,
    Link,
    Description,
}

impl Field {
    /// Value returned when every locator misses
    pub fn default_value(&self) -> &'static str {
        match self {
            Self::Title | Self::DatePosted => "N/A",
            Self::Company | Self::Location => "Unknown",
            Self::Link | Self::Description => "",
        }
    }

    /// Returns true if `value` is this field's fallback sentinel
    pub fn is_default(&self, value: &str) -> bool {
        value == self.default_value()
    }
}

/// Extracts a field from `node`, trying each locator in order
///
/// # Example
///
/// ```
/// use jobtrawl::extract::{extract, CardSnapshot, Field, Locator};
///
/// let card = CardSnapshot::parse(r#"<li><span class="co">Ferris Inc</span></li>"#);
/// let company = extract(
///     card.node(),
///     &[Locator::text(".company-v2"), Locator::text(".co")],
///     Field::Company,
/// );
/// assert_eq!(company, "Ferris Inc");
/// ```
pub fn extract(node: ElementRef<'_>, strategies: &[Locator], field: Field) -> String {
    strategies
        .iter()
        .find_map(|locator| try_locator(node, locator))
        .unwrap_or_else(|| field.default_value().to_string())
}

/// Applies a single locator, returning `None` on any kind of miss
pub fn try_locator(node: ElementRef<'_>, locator: &Locator) -> Option<String> {
    let target = match &locator.selector {
        None => node,
        Some(css) => {
            let selector = Selector::parse(css).ok()?;
            node.select(&selector).next()?
        }
    };

    let value = match &locator.read {
        Read::Text => collapse_whitespace(&element_text(target)),
        Read::FirstLine => element_lines(target).into_iter().next()?,
        Read::Block => element_lines(target).join("\n"),
        Read::Attr(name) => target.value().attr(name)?.trim().to_string(),
    };

    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// A parsed copy of one rendered result card
///
/// Browsers hand back the outer HTML of each result element; the snapshot lets
/// extraction run synchronously against it.
pub struct CardSnapshot {
    html: Html,
}

impl CardSnapshot {
    pub fn parse(outer_html: &str) -> Self {
        Self {
            html: Html::parse_fragment(outer_html),
        }
    }

    /// The card element (or the fragment root if the markup had no element)
    pub fn node(&self) -> ElementRef<'_> {
        let root = self.html.root_element();
        root.children()
            .filter_map(ElementRef::wrap)
            .next()
            .unwrap_or(root)
    }
}

/// Elements that start a new line of rendered text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tr",
    "ul",
];

/// Elements whose content is never rendered as text
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Whitespace-collapsed rendered text of an element
///
/// Inline markup does not split words: `Rust<b>acean</b>` reads `Rustacean`.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    let mut rendered = String::new();
    render_text(element, false, &mut rendered);
    collapse_whitespace(&rendered)
}

/// Non-empty trimmed lines of an element's rendered text
///
/// Lines break at block-level elements and `<br>`; source newlines inside
/// running text are plain whitespace, except within `<pre>`.
pub(crate) fn element_lines(element: ElementRef<'_>) -> Vec<String> {
    let mut rendered = String::new();
    render_text(element, false, &mut rendered);
    rendered
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

fn render_text(element: ElementRef<'_>, preformatted: bool, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if preformatted {
                    out.push_str(text);
                } else {
                    out.extend(text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }));
                }
            }
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if HIDDEN_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                } else if name == "td" || name == "th" {
                    out.push(' ');
                }
                render_text(child, preformatted || name == "pre", out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
