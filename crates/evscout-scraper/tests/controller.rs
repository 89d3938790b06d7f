//! End-to-end runs of `CrawlController` over a scripted browser.

mod support;

use std::time::Duration;

use evscout_core::{ExtractionProfile, ListingTarget, Period};
use evscout_scraper::{
    artifact_path, write_artifact, Browser, CrawlController, CrawlSettings, ExtractionResult,
};
use support::{detail_page, fast_settings, Call, Page, ScriptedBrowser, PRIMARY};

const LISTING: &str = "https://lu.ma/mlto";

fn past_target() -> ListingTarget {
    ListingTarget::new(LISTING, Period::Past)
}

/// Three event cards linking to `/a`, `/b` and `/c`.
fn three_cards() -> String {
    let card = |slug: &str, title: &str| {
        format!(
            r#"<article class="event-card"><h3>{title}</h3><span class="date">Jun 6</span><a href="/{slug}">Open</a></article>"#
        )
    };
    format!(
        "<html><body>{}{}{}</body></html>",
        card("a", "Paper Club"),
        card("b", "LLM Lab"),
        card("c", "Robotics Night")
    )
}

async fn crawl(
    browser: ScriptedBrowser,
    settings: CrawlSettings,
) -> (ExtractionResult, ScriptedBrowser) {
    let mut controller =
        CrawlController::new(browser, &ExtractionProfile::default(), settings).unwrap();
    let result = controller.run(&past_target()).await;
    (result, controller.into_browser())
}

#[tokio::test]
async fn generic_headings_yield_only_the_on_topic_event() {
    let listing = r#"<html><body>
        <div><h2>Community Guidelines Overview</h2><p>Be excellent to each other.</p></div>
        <div><h3>AI Meetup: Supercollider Night</h3><a href="/supercollider">View event</a></div>
        <div><h3>Sponsorship Opportunities</h3><p>Email us.</p></div>
    </body></html>"#;
    let browser = ScriptedBrowser::new()
        .html(LISTING, listing)
        .html("https://lu.ma/supercollider", &detail_page("83 Went"));

    let (result, browser) = crawl(browser, fast_settings()).await;

    assert_eq!(result.events.len(), 1);
    let event = &result.events[0];
    assert_eq!(event.title, "AI Meetup: Supercollider Night");
    assert_eq!(event.attendee_count, Some(83));
    assert_eq!(event.url.as_deref(), Some("https://lu.ma/supercollider"));
    assert_eq!(event.period, Some(Period::Past));

    assert_eq!(result.debug.strategy_used, "generic-heading");
    assert_eq!(result.debug.candidates_found, 3);
    assert_eq!(result.debug.candidates_rejected, 2);
    assert_eq!(result.debug.events_extracted, 1);
    assert_eq!(result.debug.events_enriched, 1);
    assert_eq!(result.debug.error, None);
    assert!(!result.debug.partial);
    assert_eq!(browser.active_context(), PRIMARY);
}

#[tokio::test]
async fn one_failing_enrichment_does_not_affect_the_others() {
    let browser = ScriptedBrowser::new()
        .html(LISTING, &three_cards())
        .html("https://lu.ma/a", &detail_page("10 went"))
        .page("https://lu.ma/b", Page::Broken)
        .html("https://lu.ma/c", &detail_page("30 went"));

    let (result, browser) = crawl(browser, fast_settings()).await;

    let summary: Vec<_> = result
        .events
        .iter()
        .map(|e| (e.title.as_str(), e.attendee_count))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Paper Club", Some(10)),
            ("LLM Lab", None),
            ("Robotics Night", Some(30)),
        ]
    );
    assert_eq!(result.debug.strategy_used, "class-card");
    assert_eq!(result.debug.enrichment_attempted, 3);
    assert_eq!(result.debug.enrichment_failures, 1);
    assert_eq!(result.debug.events_enriched, 2);
    assert_eq!(result.debug.error, None);
    assert_eq!(browser.open_contexts(), 1);
}

#[tokio::test]
async fn panicking_detail_page_is_contained() {
    let browser = ScriptedBrowser::new()
        .html(LISTING, &three_cards())
        .page("https://lu.ma/a", Page::Panics)
        .html("https://lu.ma/b", &detail_page("20 went"))
        .html("https://lu.ma/c", &detail_page("no figure here"));

    let (result, browser) = crawl(browser, fast_settings()).await;

    let counts: Vec<_> = result.events.iter().map(|e| e.attendee_count).collect();
    assert_eq!(counts, vec![None, Some(20), None]);
    assert_eq!(result.debug.enrichment_failures, 1);
    assert_eq!(result.debug.enrichment_not_found, 1);
    assert_eq!(browser.active_context(), PRIMARY);
}

#[tokio::test]
async fn unavailable_listing_still_produces_an_artifact() {
    let browser = ScriptedBrowser::new().page(LISTING, Page::Broken);

    let (result, _) = crawl(browser, fast_settings()).await;

    assert!(result.events.is_empty());
    assert!(result.is_failed());
    let error = result.debug.error.as_deref().unwrap();
    assert!(error.contains("listing page unavailable"), "{error}");
    assert_eq!(result.debug.strategy_used, "none");

    let dir = tempfile::tempdir().unwrap();
    let path = artifact_path(dir.path(), Period::Past);
    write_artifact(&path, &result).unwrap();
    let written: ExtractionResult =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.debug.error, result.debug.error);
}

#[tokio::test]
async fn empty_listing_reports_none_strategy_without_error() {
    let browser = ScriptedBrowser::new().html(
        LISTING,
        "<html><body><p>No events yet. Check back soon!</p></body></html>",
    );

    let (result, browser) = crawl(browser, fast_settings()).await;

    assert!(result.events.is_empty());
    assert_eq!(result.debug.strategy_used, "none");
    assert_eq!(result.debug.candidates_found, 0);
    assert_eq!(result.debug.error, None);
    assert!(!result.is_failed());
    assert!(!browser.calls().iter().any(|c| matches!(c, Call::Open(_))));
}

#[tokio::test]
async fn enrichment_can_be_disabled() {
    let browser = ScriptedBrowser::new().html(LISTING, &three_cards());
    let mut settings = fast_settings();
    settings.enrich = false;

    let (result, browser) = crawl(browser, settings).await;

    assert_eq!(result.events.len(), 3);
    assert!(result.events.iter().all(|e| e.attendee_count.is_none()));
    assert_eq!(result.debug.enrichment_attempted, 0);
    assert!(!browser.calls().iter().any(|c| matches!(c, Call::Open(_))));
}

#[tokio::test(start_paused = true)]
async fn network_operations_respect_minimum_interval() {
    let browser = ScriptedBrowser::new()
        .html(LISTING, &three_cards())
        .html("https://lu.ma/a", &detail_page("1 went"))
        .html("https://lu.ma/b", &detail_page("2 went"))
        .html("https://lu.ma/c", &detail_page("3 went"));
    let mut settings = fast_settings();
    settings.min_request_delay = Duration::from_secs(5);

    let (result, browser) = crawl(browser, settings).await;

    assert_eq!(result.debug.events_enriched, 3);
    let opens = browser.open_times();
    assert_eq!(opens.len(), 3);
    for pair in browser.network_times().windows(2) {
        assert!(
            pair[1] - pair[0] >= Duration::from_secs(5),
            "requests only {:?} apart",
            pair[1] - pair[0]
        );
    }
}

#[tokio::test(start_paused = true)]
async fn run_timeout_keeps_partial_results() {
    let browser = ScriptedBrowser::new()
        .html(LISTING, &three_cards())
        .html("https://lu.ma/a", &detail_page("10 went"))
        .page("https://lu.ma/b", Page::Hang)
        .html("https://lu.ma/c", &detail_page("30 went"));
    let mut settings = fast_settings();
    settings.navigation_timeout = Duration::from_secs(600);
    settings.run_timeout = Some(Duration::from_secs(60));

    let (result, browser) = crawl(browser, settings).await;

    assert!(result.debug.partial);
    assert!(result
        .debug
        .error
        .as_deref()
        .is_some_and(|e| e.contains("timed out")));
    let summary: Vec<_> = result
        .events
        .iter()
        .map(|e| (e.title.as_str(), e.attendee_count))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Paper Club", Some(10)),
            ("LLM Lab", None),
            ("Robotics Night", None),
        ]
    );
    assert_eq!(browser.active_context(), PRIMARY);
    assert_eq!(browser.open_contexts(), 1);
    assert!(!browser.calls().contains(&Call::Open("https://lu.ma/c".to_string())));
}

#[tokio::test(start_paused = true)]
async fn run_timeout_closes_a_detail_page_still_loading() {
    let browser = ScriptedBrowser::new()
        .html(LISTING, &three_cards())
        .html("https://lu.ma/a", &detail_page("10 went"))
        .page("https://lu.ma/b", Page::Blank)
        .html("https://lu.ma/c", &detail_page("30 went"));
    let mut settings = fast_settings();
    settings.navigation_timeout = Duration::from_secs(600);
    settings.run_timeout = Some(Duration::from_secs(60));

    let (result, browser) = crawl(browser, settings).await;

    assert!(result.debug.partial);
    assert_eq!(
        result.debug.error.as_deref(),
        Some("run timed out after 60s")
    );
    assert_eq!(result.events.len(), 3);
    assert_eq!(result.events[0].attendee_count, Some(10));
    assert_eq!(browser.active_context(), PRIMARY);
    assert_eq!(browser.open_contexts(), 1, "detail context leaked");
    assert!(browser
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Close(_))));
    assert!(!browser.calls().contains(&Call::Open("https://lu.ma/c".to_string())));
}
