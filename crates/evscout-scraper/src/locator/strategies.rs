use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{ExtractionContext, LocatorStrategy};
use crate::error::LocateError;
use crate::text::visible_text;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

static HEADING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid selector"));

/// Any CSS selector. The selector is parsed on every `locate` call so a
/// malformed profile entry surfaces as a per-strategy failure instead of
/// refusing to start.
pub struct CssStrategy {
    name: String,
    selector: String,
}

impl CssStrategy {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
        }
    }
}

impl LocatorStrategy for CssStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn locate<'a>(&self, document: &'a Html) -> Result<Vec<ElementRef<'a>>, LocateError> {
        let selector =
            Selector::parse(&self.selector).map_err(|e| LocateError::InvalidSelector {
                strategy: self.name.clone(),
                selector: self.selector.clone(),
                reason: e.to_string(),
            })?;
        Ok(document.select(&selector).collect())
    }
}

/// Anchors whose `href` contains one of the event-path markers (`/event/`,
/// `/e/`, ...).
pub struct HrefMarkerStrategy {
    markers: Vec<String>,
}

impl HrefMarkerStrategy {
    #[must_use]
    pub fn new(markers: Vec<String>) -> Self {
        let markers = markers
            .into_iter()
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { markers }
    }
}

impl LocatorStrategy for HrefMarkerStrategy {
    fn name(&self) -> &str {
        "event-link"
    }

    fn locate<'a>(&self, document: &'a Html) -> Result<Vec<ElementRef<'a>>, LocateError> {
        if self.markers.is_empty() {
            return Ok(Vec::new());
        }
        Ok(document
            .select(&LINK_SELECTOR)
            .filter(|a| {
                a.value().attr("href").is_some_and(|href| {
                    let href = href.to_ascii_lowercase();
                    self.markers.iter().any(|m| href.contains(m.as_str()))
                })
            })
            .collect())
    }
}

/// Last resort: headings long enough to be a title. Topical filtering happens
/// at field extraction, where a rejection can be counted.
pub struct GenericHeadingStrategy {
    min_title_len: usize,
}

impl GenericHeadingStrategy {
    #[must_use]
    pub fn new(min_title_len: usize) -> Self {
        Self { min_title_len }
    }
}

impl LocatorStrategy for GenericHeadingStrategy {
    fn name(&self) -> &str {
        "generic-heading"
    }

    fn context(&self) -> ExtractionContext {
        ExtractionContext::Generic
    }

    fn locate<'a>(&self, document: &'a Html) -> Result<Vec<ElementRef<'a>>, LocateError> {
        Ok(document
            .select(&HEADING_SELECTOR)
            .filter(|h| visible_text(*h).chars().count() > self.min_title_len)
            .collect())
    }
}
