//! Result assembly: the last step of every run, successful or not.

use crate::types::{DebugInfo, EventRecord, ExtractionResult, RunDiagnostics};

/// Combine finalized events with the run's diagnostics.
///
/// Pure and infallible. `events_extracted` and `events_enriched` are derived
/// from `events` so the summary can never disagree with the list.
#[must_use]
pub fn assemble(events: Vec<EventRecord>, diagnostics: RunDiagnostics) -> ExtractionResult {
    let events_extracted = events.len();
    let events_enriched = events
        .iter()
        .filter(|e| e.attendee_count.is_some())
        .count();

    let RunDiagnostics {
        scraped_at,
        source_url,
        period,
        strategy_used,
        candidates_found,
        candidates_rejected,
        enrichment_attempted,
        enrichment_failures,
        enrichment_not_found,
        partial,
        error,
    } = diagnostics;

    ExtractionResult {
        events,
        debug: DebugInfo {
            scraped_at,
            source_url,
            period,
            strategy_used,
            candidates_found,
            candidates_rejected,
            events_extracted,
            events_enriched,
            enrichment_attempted,
            enrichment_failures,
            enrichment_not_found,
            partial,
            error,
        },
    }
}
