//! Attendance-figure extraction from a detail page.

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::error::SetupError;
use crate::text::{lowered, visible_text};

/// Elements with more text than this are containers, not labels.
const MAX_LABEL_CHARS: usize = 40;

/// Finds "<number> <keyword>" figures such as `83 Went` or `1,204 attendees`.
#[derive(Debug, Clone)]
pub struct MetricExtractor {
    pattern: Regex,
    keyword: Regex,
}

impl MetricExtractor {
    /// # Errors
    ///
    /// Returns [`SetupError::NoMetricKeywords`] for an empty keyword list and
    /// [`SetupError::Pattern`] if the keywords cannot form a valid pattern.
    pub fn new(keywords: &[String]) -> Result<Self, SetupError> {
        let keywords = lowered(keywords);
        if keywords.is_empty() {
            return Err(SetupError::NoMetricKeywords);
        }
        let alternatives = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(
            r"(?i)\b(\d{{1,3}}(?:,\d{{3}})+|\d+)\+?\s+(?:{alternatives})\b"
        ))?;
        let keyword = Regex::new(&format!(r"(?i)\b(?:{alternatives})\b"))?;
        Ok(Self { pattern, keyword })
    }

    /// Attendance figure on the page, if any.
    ///
    /// Tries a full-text pattern search first, then falls back to short
    /// elements mentioning a keyword and reads their leading number. `None`
    /// means the page shows no figure, which is a normal outcome.
    #[must_use]
    pub fn extract(&self, html: &str) -> Option<u32> {
        let document = Html::parse_document(html);
        let text = visible_text(document.root_element());

        let from_text = self
            .pattern
            .captures_iter(&text)
            .find_map(|caps| caps.get(1).and_then(|m| parse_count(m.as_str())));
        if from_text.is_some() {
            return from_text;
        }

        let from_labels = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .map(visible_text)
            .filter(|t| t.chars().count() < MAX_LABEL_CHARS)
            .filter(|t| self.keyword.is_match(t))
            .find_map(|t| leading_count(&t));
        from_labels
    }
}

fn parse_count(digits: &str) -> Option<u32> {
    digits.replace(',', "").parse().ok()
}

fn leading_count(text: &str) -> Option<u32> {
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    let digits = digits.trim_end_matches(',');
    if digits.is_empty() {
        return None;
    }
    parse_count(digits)
}
