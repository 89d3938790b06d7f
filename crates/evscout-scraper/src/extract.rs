//! Per-candidate field extraction.
//!
//! Each field walks a fixed list of sub-locators scoped to the candidate and
//! keeps the first non-empty text that passes that field's validation. Only
//! the title is mandatory; every other field is simply left unset.

use std::sync::LazyLock;

use evscout_core::{ExtractionProfile, Period};
use scraper::{ElementRef, Selector};

use crate::error::FieldValidationFailure;
use crate::locator::ExtractionContext;
use crate::text::{contains_any, is_heading, lowered, non_empty_text};
use crate::types::EventDraft;
use crate::urls::resolve_event_url;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static TITLED_HEADING: LazyLock<Selector> = LazyLock::new(|| {
    let parts: Vec<String> = (1..=6)
        .flat_map(|n| [format!(r#"h{n}[class*="title"]"#), format!(r#"h{n}[class*="name"]"#)])
        .collect();
    selector(&parts.join(", "))
});
static ANY_HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h1, h2, h3, h4, h5, h6"));
static TITLED_ELEMENT: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[class*="title"], [class*="name"]"#));
static DATE_CLASS: LazyLock<Selector> = LazyLock::new(|| selector(r#"[class*="date"]"#));
static TIME_CLASS: LazyLock<Selector> = LazyLock::new(|| selector(r#"[class*="time"]"#));
static TIME_ELEMENT: LazyLock<Selector> = LazyLock::new(|| selector("time"));
static LOCATION_CLASSES: LazyLock<[Selector; 3]> = LazyLock::new(|| {
    [
        selector(r#"[class*="location"]"#),
        selector(r#"[class*="venue"]"#),
        selector(r#"[class*="address"]"#),
    ]
});
static TEXT_BLOCK: LazyLock<Selector> = LazyLock::new(|| selector("span, p, div"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

const ATTRIBUTION_PREFIX: &str = "by ";

/// Validation thresholds and allowlists, lowercased once per run.
#[derive(Debug, Clone)]
pub struct FieldRules {
    topical_keywords: Vec<String>,
    venue_keywords: Vec<String>,
    min_title_len: usize,
    max_time_len: usize,
}

impl FieldRules {
    #[must_use]
    pub fn from_profile(profile: &ExtractionProfile) -> Self {
        Self {
            topical_keywords: lowered(&profile.topical_keywords),
            venue_keywords: lowered(&profile.venue_keywords),
            min_title_len: profile.min_title_len,
            max_time_len: profile.max_time_len,
        }
    }
}

/// Field extraction bound to one listing target.
pub struct FieldExtractor<'r> {
    rules: &'r FieldRules,
    base_origin: String,
    period: Period,
}

impl<'r> FieldExtractor<'r> {
    #[must_use]
    pub fn new(rules: &'r FieldRules, base_origin: impl Into<String>, period: Period) -> Self {
        Self {
            rules,
            base_origin: base_origin.into(),
            period,
        }
    }

    /// Build a draft from one located candidate.
    ///
    /// # Errors
    ///
    /// Returns [`FieldValidationFailure`] when no acceptable title is found;
    /// the caller drops the candidate.
    pub fn extract(
        &self,
        node: ElementRef<'_>,
        context: ExtractionContext,
    ) -> Result<EventDraft, FieldValidationFailure> {
        let title = self.title(node, context)?;

        // A bare heading carries nothing else; the elements around it do.
        let scope = match context {
            ExtractionContext::Card => Scope::Within(node),
            ExtractionContext::Generic => generic_scope(node),
        };

        let period = match self.period {
            Period::Unknown => infer_period(node),
            tagged => tagged,
        };

        Ok(EventDraft {
            title,
            date: scope
                .first_text(&DATE_CLASS)
                .or_else(|| scope.first_text(&TIME_ELEMENT)),
            time: self.time(&scope),
            location: self.location(&scope, context),
            url: self.url(node, &scope),
            period,
            attendee_count: None,
        })
    }

    fn title(
        &self,
        node: ElementRef<'_>,
        context: ExtractionContext,
    ) -> Result<String, FieldValidationFailure> {
        let own_text = || {
            (is_heading(node) || node.value().name() == "a")
                .then(|| non_empty_text(node))
                .flatten()
        };
        let title = match context {
            ExtractionContext::Generic if is_heading(node) => own_text(),
            _ => first_text(node, &TITLED_HEADING)
                .or_else(|| first_text(node, &ANY_HEADING))
                .or_else(|| {
                    within(node, &TITLED_ELEMENT)
                        .into_iter()
                        .filter(|e| !is_heading(*e))
                        .find_map(non_empty_text)
                })
                .or_else(own_text),
        }
        .ok_or(FieldValidationFailure::MissingTitle)?;

        if context == ExtractionContext::Generic {
            if title.chars().count() <= self.rules.min_title_len {
                return Err(FieldValidationFailure::TitleTooShort {
                    title,
                    min: self.rules.min_title_len,
                });
            }
            if !contains_any(&title, &self.rules.topical_keywords) {
                return Err(FieldValidationFailure::OffTopicTitle { title });
            }
        }
        Ok(title)
    }

    fn time(&self, scope: &Scope<'_>) -> Option<String> {
        let accept = |text: &String| {
            text.contains(':') && text.chars().count() < self.rules.max_time_len
        };
        [&*TIME_CLASS, &*TIME_ELEMENT].into_iter().find_map(|sel| {
            scope
                .select(sel)
                .into_iter()
                .filter_map(non_empty_text)
                .find(accept)
        })
    }

    fn location(&self, scope: &Scope<'_>, context: ExtractionContext) -> Option<String> {
        let generic = context == ExtractionContext::Generic;
        let accept = |text: &String| {
            let attributed = text
                .get(..ATTRIBUTION_PREFIX.len())
                .is_some_and(|p| p.eq_ignore_ascii_case(ATTRIBUTION_PREFIX));
            !attributed && (!generic || contains_any(text, &self.rules.venue_keywords))
        };

        let by_class = LOCATION_CLASSES.iter().find_map(|sel| {
            scope
                .select(sel)
                .into_iter()
                .filter_map(non_empty_text)
                .find(accept)
        });
        if by_class.is_some() || !generic {
            return by_class;
        }

        scope
            .select(&TEXT_BLOCK)
            .into_iter()
            .filter(|e| e.children().all(|c| !c.value().is_element()))
            .filter_map(non_empty_text)
            .find(accept)
    }

    fn url(&self, node: ElementRef<'_>, scope: &Scope<'_>) -> Option<String> {
        let resolve = |e: ElementRef<'_>| {
            e.value()
                .attr("href")
                .and_then(|href| resolve_event_url(&self.base_origin, href))
        };

        if node.value().name() == "a" {
            if let Some(url) = resolve(node) {
                return Some(url);
            }
        }
        scope
            .select(&LINK)
            .into_iter()
            .find_map(resolve)
            .or_else(|| {
                node.ancestors()
                    .filter_map(ElementRef::wrap)
                    .filter(|a| a.value().name() == "a")
                    .find_map(resolve)
            })
    }
}

/// Where a candidate's non-title fields are looked up.
enum Scope<'a> {
    /// Descendants of one element, the element itself excluded.
    Within(ElementRef<'a>),
    /// A run of sibling elements, each searched including itself.
    Siblings(Vec<ElementRef<'a>>),
}

impl<'a> Scope<'a> {
    fn select(&self, selector: &Selector) -> Vec<ElementRef<'a>> {
        match self {
            Scope::Within(root) => within(*root, selector),
            Scope::Siblings(roots) => roots
                .iter()
                .flat_map(|r| {
                    let own = selector.matches(r).then_some(*r);
                    own.into_iter().chain(r.select(selector))
                })
                .collect(),
        }
    }

    fn first_text(&self, selector: &Selector) -> Option<String> {
        self.select(selector).into_iter().find_map(non_empty_text)
    }
}

/// The part of the page that belongs to a generic heading.
///
/// The heading's parent, unless the parent also holds another heading of the
/// same or a higher level. In that case the siblings following the heading up
/// to the next such heading.
fn generic_scope(heading: ElementRef<'_>) -> Scope<'_> {
    let rank = heading_rank(heading);
    let rival = |h: ElementRef<'_>| h.id() != heading.id() && heading_rank(h) <= rank;
    let competes = |root: ElementRef<'_>| {
        (ANY_HEADING.matches(&root) && rival(root)) || root.select(&ANY_HEADING).any(rival)
    };

    if let Some(parent) = heading.parent().and_then(ElementRef::wrap) {
        if !competes(parent) {
            return Scope::Within(parent);
        }
    }
    Scope::Siblings(
        heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|s| !competes(*s))
            .collect(),
    )
}

/// `1` for `h1` through `6` for `h6`.
fn heading_rank(heading: ElementRef<'_>) -> u8 {
    heading
        .value()
        .name()
        .strip_prefix('h')
        .and_then(|level| level.parse().ok())
        .unwrap_or(u8::MAX)
}

/// Descendants of `scope` matching `selector`, excluding `scope` itself.
fn within<'a>(scope: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    scope.select(selector).collect()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    within(scope, selector).into_iter().find_map(non_empty_text)
}

fn words(label: &str) -> impl Iterator<Item = &str> {
    label.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

/// Guess the listing tab a candidate sits under from its enclosing sections.
fn infer_period(node: ElementRef<'_>) -> Period {
    for ancestor in node.ancestors().filter_map(ElementRef::wrap) {
        if !matches!(ancestor.value().name(), "section" | "div") {
            continue;
        }
        let mut labels: Vec<String> = ["id", "class"]
            .iter()
            .filter_map(|attr| ancestor.value().attr(attr))
            .map(str::to_lowercase)
            .collect();
        labels.extend(
            ancestor
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| is_heading(*c))
                .filter_map(non_empty_text)
                .map(|t| t.to_lowercase()),
        );

        for label in &labels {
            for word in words(label) {
                match word {
                    "upcoming" | "future" => return Period::Upcoming,
                    "past" | "previous" => return Period::Past,
                    _ => {}
                }
            }
        }
    }
    Period::Unknown
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
