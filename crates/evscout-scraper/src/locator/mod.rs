//! Candidate-node location.
//!
//! Tries locator strategies in priority order (event links, test-id cards,
//! card classes, articles, event-ish classes, generic headings) and keeps the
//! result of the first one that finds anything. A strategy that fails to
//! evaluate counts as finding nothing; running out of strategies is reported
//! as the `"none"` strategy, never as an error.

mod strategies;

use std::collections::{HashMap, HashSet};

use evscout_core::ExtractionProfile;
use scraper::{ElementRef, Html};

pub use strategies::{CssStrategy, GenericHeadingStrategy, HrefMarkerStrategy};

use crate::error::LocateError;
use crate::types::NO_STRATEGY;

/// How much the winning strategy vouches for its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionContext {
    /// The node is a confirmed event container (card, article, event link).
    Card,
    /// The node is only a plausible heading; field validation is stricter.
    Generic,
}

pub trait LocatorStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn context(&self) -> ExtractionContext {
        ExtractionContext::Card
    }

    /// Candidate nodes in document order.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError`] when the strategy cannot be evaluated (for
    /// example an unparsable selector); the chain treats that as no match.
    fn locate<'a>(&self, document: &'a Html) -> Result<Vec<ElementRef<'a>>, LocateError>;
}

/// Outcome of running the chain over one document.
#[derive(Debug)]
pub struct Located<'a> {
    pub nodes: Vec<ElementRef<'a>>,
    pub strategy: String,
    pub context: ExtractionContext,
}

pub struct StrategyChain {
    strategies: Vec<Box<dyn LocatorStrategy>>,
}

impl StrategyChain {
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn LocatorStrategy>>) -> Self {
        Self { strategies }
    }

    /// The default chain, preceded by any `extra_selectors` from the profile.
    #[must_use]
    pub fn from_profile(profile: &ExtractionProfile) -> Self {
        let mut strategies: Vec<Box<dyn LocatorStrategy>> = profile
            .extra_selectors
            .iter()
            .enumerate()
            .map(|(i, selector)| {
                Box::new(CssStrategy::new(format!("extra-{}", i + 1), selector.clone()))
                    as Box<dyn LocatorStrategy>
            })
            .collect();

        strategies.push(Box::new(HrefMarkerStrategy::new(
            profile.event_path_markers.clone(),
        )));
        strategies.push(Box::new(CssStrategy::new(
            "testid-card",
            r#"[data-testid="event-card"]"#,
        )));
        strategies.push(Box::new(CssStrategy::new(
            "class-card",
            ".event-card, .event-item",
        )));
        strategies.push(Box::new(CssStrategy::new("article", "article")));
        strategies.push(Box::new(CssStrategy::new(
            "class-contains-event",
            r#"[class*="event"]"#,
        )));
        strategies.push(Box::new(GenericHeadingStrategy::new(profile.min_title_len)));

        Self::new(strategies)
    }

    #[must_use]
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run strategies in order and return the first non-empty result.
    pub fn locate<'a>(&self, document: &'a Html) -> Located<'a> {
        for strategy in &self.strategies {
            let nodes = match strategy.locate(document) {
                Ok(nodes) => one_per_event(nodes),
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %e,
                        "strategy failed; skipping"
                    );
                    continue;
                }
            };
            tracing::debug!(
                strategy = strategy.name(),
                count = nodes.len(),
                "strategy evaluated"
            );
            if !nodes.is_empty() {
                return Located {
                    nodes,
                    strategy: strategy.name().to_string(),
                    context: strategy.context(),
                };
            }
        }

        tracing::debug!("no strategy matched any candidate");
        Located {
            nodes: Vec::new(),
            strategy: NO_STRATEGY.to_string(),
            context: ExtractionContext::Generic,
        }
    }
}

/// Reduce nested matches to one node per event. Input and output are in
/// document order.
///
/// A match wrapping other matches is normally an event card holding matched
/// parts (`event-title`, `event-date`), so the outer node wins. When it wraps
/// two or more alike matches (same tag and class) it is a list of events
/// instead, and the rows win.
fn one_per_event(nodes: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    let mut seen = HashSet::new();
    let nodes: Vec<_> = nodes.into_iter().filter(|n| seen.insert(n.id())).collect();

    let nearest_match = |node: ElementRef<'_>| {
        node.ancestors()
            .map(|a| a.id())
            .find(|id| seen.contains(id))
    };

    let mut rows: HashMap<_, HashMap<_, usize>> = HashMap::new();
    for node in &nodes {
        if let Some(container) = nearest_match(*node) {
            let shape = (node.value().name(), node.value().attr("class"));
            *rows.entry(container).or_default().entry(shape).or_default() += 1;
        }
    }
    let is_list = |node: ElementRef<'_>| {
        rows.get(&node.id())
            .is_some_and(|shapes| shapes.values().any(|&n| n >= 2))
    };

    nodes
        .into_iter()
        .filter(|node| {
            !is_list(*node)
                && node
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .filter(|a| seen.contains(&a.id()))
                    .all(is_list)
        })
        .collect()
}
