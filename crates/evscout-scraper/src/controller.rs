//! Run orchestration for one listing target.
//!
//! A run renders the listing, locates and extracts candidates, enriches each
//! accepted draft in document order and assembles the artifact. Failures are
//! contained at the smallest scope that holds them: a bad candidate is
//! dropped, a failed enrichment leaves one count unset, and only an
//! unavailable listing aborts the run (still producing an artifact).

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::Utc;
use evscout_core::{AppConfig, ExtractionProfile, ListingTarget};
use scraper::Html;
use tokio::time::Instant;

use crate::assemble::assemble;
use crate::browser::Browser;
use crate::enrich::EnrichmentNavigator;
use crate::error::{RunError, SetupError};
use crate::extract::{FieldExtractor, FieldRules};
use crate::locator::StrategyChain;
use crate::metric::MetricExtractor;
use crate::rate_limit::Pacer;
use crate::types::{EventDraft, EventRecord, ExtractionResult, RunDiagnostics};

/// Tunables for a crawl, normally derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Minimum spacing between network-facing operations.
    pub min_request_delay: Duration,
    pub navigation_timeout: Duration,
    /// How often a detail page is re-read while waiting for it to render.
    pub poll_interval: Duration,
    /// Upper bound for a whole run; `None` means unbounded.
    pub run_timeout: Option<Duration>,
    pub enrich: bool,
}

impl CrawlSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_request_delay: Duration::from_millis(config.min_request_delay_ms),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            poll_interval: Duration::from_millis(250),
            run_timeout: config.run_timeout_secs.map(Duration::from_secs),
            enrich: config.enrich,
        }
    }
}

/// Events finalized so far plus the drafts still waiting for enrichment.
///
/// Kept outside the crawl future so a run timeout can still flush it.
struct RunProgress {
    diagnostics: RunDiagnostics,
    done: Vec<EventRecord>,
    pending: VecDeque<EventDraft>,
}

impl RunProgress {
    fn new(diagnostics: RunDiagnostics) -> Self {
        Self {
            diagnostics,
            done: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn complete_front(&mut self, attendee_count: Option<u32>) {
        if let Some(mut draft) = self.pending.pop_front() {
            draft.attendee_count = attendee_count;
            self.done.push(draft.finalize(self.diagnostics.scraped_at));
        }
    }

    fn finish(mut self) -> ExtractionResult {
        let scraped_at = self.diagnostics.scraped_at;
        self.done
            .extend(self.pending.drain(..).map(|d| d.finalize(scraped_at)));
        assemble(self.done, self.diagnostics)
    }
}

pub struct CrawlController<B> {
    browser: B,
    chain: StrategyChain,
    rules: FieldRules,
    navigator: EnrichmentNavigator,
    pacer: Pacer,
    settings: CrawlSettings,
}

impl<B: Browser> CrawlController<B> {
    /// # Errors
    ///
    /// Returns [`SetupError`] if the profile's metric keywords cannot be
    /// compiled.
    pub fn new(
        browser: B,
        profile: &ExtractionProfile,
        settings: CrawlSettings,
    ) -> Result<Self, SetupError> {
        let metric = MetricExtractor::new(&profile.metric_keywords)?;
        let navigator = EnrichmentNavigator::new(metric, settings.navigation_timeout)
            .with_poll_interval(settings.poll_interval);

        Ok(Self {
            browser,
            chain: StrategyChain::from_profile(profile),
            rules: FieldRules::from_profile(profile),
            navigator,
            pacer: Pacer::new(settings.min_request_delay),
            settings,
        })
    }

    #[must_use]
    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn into_browser(self) -> B {
        self.browser
    }

    /// Crawl one listing target. Always yields an artifact; problems are
    /// reported in its `debug` block.
    pub async fn run(&mut self, target: &ListingTarget) -> ExtractionResult {
        let scraped_at = Utc::now();
        let primary = self.browser.active_context();
        let mut progress =
            RunProgress::new(RunDiagnostics::new(&target.url, target.period, scraped_at));

        tracing::info!(url = %target.url, period = %target.period, "crawling listing");

        let deadline = self.settings.run_timeout.map(Deadline::after);
        match self.crawl(target, deadline, &mut progress).await {
            Ok(()) => {}
            Err(e @ RunError::TimedOut { .. }) => {
                tracing::warn!(
                    url = %target.url,
                    error = %e,
                    pending = progress.pending.len(),
                    "run timed out; keeping partial results"
                );
                progress.diagnostics.partial = true;
                progress.diagnostics.error = Some(e.to_string());
                if let Err(e) = self.browser.focus(primary).await {
                    tracing::warn!(error = %e, "failed to refocus primary context after timeout");
                }
            }
            Err(e) => {
                tracing::error!(url = %target.url, error = %e, "listing run failed");
                progress.diagnostics.error = Some(e.to_string());
            }
        }

        let result = progress.finish();
        tracing::info!(
            url = %target.url,
            strategy = %result.debug.strategy_used,
            candidates = result.debug.candidates_found,
            extracted = result.debug.events_extracted,
            enriched = result.debug.events_enriched,
            "listing run complete"
        );
        result
    }

    async fn crawl(
        &mut self,
        target: &ListingTarget,
        deadline: Option<Deadline>,
        progress: &mut RunProgress,
    ) -> Result<(), RunError> {
        let base_origin = target.base_origin()?;

        before(deadline, self.pacer.wait()).await?;
        let html = before(deadline, self.browser.render(&target.url)).await??;

        let extractor = FieldExtractor::new(&self.rules, base_origin, target.period);
        let drafts = scan_listing(&self.chain, &extractor, &html, &mut progress.diagnostics);
        progress.pending.extend(drafts);

        loop {
            if let Some(d) = deadline.filter(Deadline::passed) {
                return Err(d.expired());
            }
            let Some(url) = progress.pending.front().map(|d| d.url.clone()) else {
                break;
            };
            let count = match url {
                Some(url) if self.settings.enrich => {
                    self.enrich_one(&url, deadline, &mut progress.diagnostics)
                        .await?
                }
                _ => None,
            };
            progress.complete_front(count);
        }
        Ok(())
    }

    async fn enrich_one(
        &mut self,
        url: &str,
        deadline: Option<Deadline>,
        diagnostics: &mut RunDiagnostics,
    ) -> Result<Option<u32>, RunError> {
        before(deadline, self.pacer.wait()).await?;
        diagnostics.enrichment_attempted += 1;

        let outcome = self
            .navigator
            .enrich_until(&mut self.browser, url, deadline.map(|d| d.at))
            .await;
        match &outcome.failure {
            Some(e) if e.is_not_found() => diagnostics.enrichment_not_found += 1,
            Some(_) => diagnostics.enrichment_failures += 1,
            None => {}
        }
        Ok(outcome.count)
    }
}

/// Whole-run time limit.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now() + limit,
            limit,
        }
    }

    fn passed(&self) -> bool {
        Instant::now() >= self.at
    }

    fn expired(self) -> RunError {
        RunError::TimedOut {
            limit_secs: self.limit.as_secs(),
        }
    }
}

/// Await `fut` unless the run deadline passes first. Only for steps that may
/// be abandoned midway; the navigator enforces the deadline itself so its
/// cleanup always runs.
async fn before<F: Future>(deadline: Option<Deadline>, fut: F) -> Result<F::Output, RunError> {
    match deadline {
        Some(d) => tokio::time::timeout_at(d.at, fut)
            .await
            .map_err(|_| d.expired()),
        None => Ok(fut.await),
    }
}

/// Locate and extract candidates from the listing markup.
///
/// Synchronous so the parsed document never lives across an await point.
/// A candidate whose extraction panics is counted as rejected and skipped.
fn scan_listing(
    chain: &StrategyChain,
    extractor: &FieldExtractor<'_>,
    html: &str,
    diagnostics: &mut RunDiagnostics,
) -> Vec<EventDraft> {
    let document = Html::parse_document(html);
    let located = chain.locate(&document);

    diagnostics.strategy_used.clone_from(&located.strategy);
    diagnostics.candidates_found = located.nodes.len();

    let mut drafts = Vec::with_capacity(located.nodes.len());
    for (index, node) in located.nodes.iter().enumerate() {
        let attempt =
            std::panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(*node, located.context)));
        match attempt {
            Ok(Ok(draft)) => drafts.push(draft),
            Ok(Err(reason)) => {
                diagnostics.candidates_rejected += 1;
                tracing::debug!(index, reason = %reason, "candidate rejected");
            }
            Err(_) => {
                diagnostics.candidates_rejected += 1;
                tracing::warn!(index, "candidate extraction panicked; skipping");
            }
        }
    }

    tracing::debug!(
        strategy = %located.strategy,
        found = located.nodes.len(),
        accepted = drafts.len(),
        "listing scanned"
    );
    drafts
}
