//! Event records and the per-run artifact envelope.
//!
//! A record moves through two shapes: [`EventDraft`] while the pipeline is
//! still working on it (fields from the listing, then at most one attendance
//! update from enrichment) and [`EventRecord`] once it is finalized with its
//! capture time. Only finalized records reach the artifact.

use chrono::{DateTime, Utc};
use evscout_core::Period;
use serde::{Deserialize, Serialize};

/// Strategy name recorded when no locator strategy matched anything.
pub const NO_STRATEGY: &str = "none";

/// An event as read off the listing, not yet finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub period: Period,
    pub attendee_count: Option<u32>,
}

impl EventDraft {
    /// Freeze the draft into a record captured at `scraped_at`.
    #[must_use]
    pub fn finalize(self, scraped_at: DateTime<Utc>) -> EventRecord {
        EventRecord {
            title: self.title,
            date: self.date,
            time: self.time,
            location: self.location,
            url: self.url,
            period: Some(self.period),
            attendee_count: self.attendee_count,
            scraped_at,
        }
    }
}

/// One scraped event as persisted in the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    /// Absolute detail-page URL.
    pub url: Option<String>,
    pub period: Option<Period>,
    /// Present only when enrichment found a figure; never defaulted to zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_count: Option<u32>,
    pub scraped_at: DateTime<Utc>,
}

/// Counters and context accumulated while a run is in progress.
///
/// Totals that can be derived from the event list (`events_extracted`,
/// `events_enriched`) are deliberately absent here; the assembler computes
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDiagnostics {
    pub scraped_at: DateTime<Utc>,
    pub source_url: String,
    pub period: Period,
    pub strategy_used: String,
    pub candidates_found: usize,
    pub candidates_rejected: usize,
    pub enrichment_attempted: usize,
    pub enrichment_failures: usize,
    pub enrichment_not_found: usize,
    pub partial: bool,
    pub error: Option<String>,
}

impl RunDiagnostics {
    #[must_use]
    pub fn new(source_url: impl Into<String>, period: Period, scraped_at: DateTime<Utc>) -> Self {
        Self {
            scraped_at,
            source_url: source_url.into(),
            period,
            strategy_used: NO_STRATEGY.to_string(),
            candidates_found: 0,
            candidates_rejected: 0,
            enrichment_attempted: 0,
            enrichment_failures: 0,
            enrichment_not_found: 0,
            partial: false,
            error: None,
        }
    }
}

/// The `debug` block of the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub scraped_at: DateTime<Utc>,
    pub source_url: String,
    pub period: Period,
    pub strategy_used: String,
    pub candidates_found: usize,
    pub candidates_rejected: usize,
    pub events_extracted: usize,
    pub events_enriched: usize,
    pub enrichment_attempted: usize,
    pub enrichment_failures: usize,
    pub enrichment_not_found: usize,
    pub partial: bool,
    pub error: Option<String>,
}

/// The artifact written once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub events: Vec<EventRecord>,
    pub debug: DebugInfo,
}

impl ExtractionResult {
    /// `true` when the run aborted before producing anything usable.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.events.is_empty() && self.debug.error.is_some()
    }
}
