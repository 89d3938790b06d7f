//! Text helpers shared by the locator, field extractor and metric search.

use scraper::ElementRef;

/// Elements whose text never renders.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Collapse runs of whitespace to single spaces and trim both ends.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rendered text of `element`: text nodes in document order, separated by
/// single spaces, with script and style content skipped.
pub(crate) fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

/// Visible text, or `None` when it is empty after trimming.
pub(crate) fn non_empty_text(element: ElementRef<'_>) -> Option<String> {
    let text = visible_text(element);
    (!text.is_empty()).then_some(text)
}

pub(crate) fn is_heading(element: ElementRef<'_>) -> bool {
    HEADINGS.contains(&element.value().name())
}

/// Case-insensitive "contains any of" over pre-lowercased needles.
pub(crate) fn contains_any(haystack: &str, lowered_needles: &[String]) -> bool {
    let lower = haystack.to_lowercase();
    lowered_needles.iter().any(|n| lower.contains(n.as_str()))
}

/// Lowercase and trim a keyword list, dropping blanks.
pub(crate) fn lowered(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}
