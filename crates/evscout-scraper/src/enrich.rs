//! Detail-page enrichment.
//!
//! One invocation walks `Idle -> OpeningDetailContext -> AwaitingDetailLoad ->
//! ExtractingMetric -> ClosingDetailContext -> Done`. Any failure on the way
//! jumps straight to `ClosingDetailContext`. Closing the secondary context and
//! refocusing the primary one happen in a single place after the guarded
//! body, so they run on success, on error and on panic alike.

use std::panic::AssertUnwindSafe;
use std::sync::LazyLock;
use std::time::Duration;

use futures::FutureExt;
use scraper::{Html, Selector};
use tokio::time::Instant;

use crate::browser::{Browser, ContextHandle};
use crate::error::EnrichmentError;
use crate::metric::MetricExtractor;
use crate::text::non_empty_text;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigatorState {
    Idle,
    OpeningDetailContext,
    AwaitingDetailLoad,
    ExtractingMetric,
    ClosingDetailContext,
    Done,
}

/// Result of one enrichment invocation.
#[derive(Debug)]
pub struct EnrichmentOutcome {
    pub count: Option<u32>,
    /// Why `count` is `None`; also `None` on success.
    pub failure: Option<EnrichmentError>,
    /// States visited, in order.
    pub trail: Vec<NavigatorState>,
}

pub struct EnrichmentNavigator {
    metric: MetricExtractor,
    navigation_timeout: Duration,
    poll_interval: Duration,
}

impl EnrichmentNavigator {
    #[must_use]
    pub fn new(metric: MetricExtractor, navigation_timeout: Duration) -> Self {
        Self {
            metric,
            navigation_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Open `url` in a secondary context, read the attendance figure and
    /// return focus to whichever context was active on entry.
    ///
    /// Never fails outright: every problem is reported through
    /// [`EnrichmentOutcome::failure`] with `count` left `None`.
    pub async fn enrich<B>(&self, browser: &mut B, url: &str) -> EnrichmentOutcome
    where
        B: Browser + ?Sized,
    {
        self.enrich_until(browser, url, None).await
    }

    /// Like [`EnrichmentNavigator::enrich`], but no step waits past
    /// `deadline`. Cleanup still runs when the deadline cuts a step short.
    pub async fn enrich_until<B>(
        &self,
        browser: &mut B,
        url: &str,
        deadline: Option<Instant>,
    ) -> EnrichmentOutcome
    where
        B: Browser + ?Sized,
    {
        let primary = browser.active_context();
        let mut trail = vec![NavigatorState::Idle];
        let mut opened = None;

        let guarded = AssertUnwindSafe(self.visit(&mut *browser, url, deadline, &mut opened, &mut trail))
            .catch_unwind()
            .await;
        let result = guarded.unwrap_or_else(|_| {
            Err(EnrichmentError::Faulted {
                url: url.to_owned(),
            })
        });

        enter(&mut trail, NavigatorState::ClosingDetailContext, url);
        restore(browser, primary, opened).await;
        enter(&mut trail, NavigatorState::Done, url);

        match result {
            Ok(count) => {
                tracing::debug!(url, count, "enriched event");
                EnrichmentOutcome {
                    count: Some(count),
                    failure: None,
                    trail,
                }
            }
            Err(e) => {
                if e.is_not_found() {
                    tracing::debug!(url, "no attendance figure on detail page");
                } else {
                    tracing::warn!(url, error = %e, "enrichment failed");
                }
                EnrichmentOutcome {
                    count: None,
                    failure: Some(e),
                    trail,
                }
            }
        }
    }

    async fn visit<B>(
        &self,
        browser: &mut B,
        url: &str,
        deadline: Option<Instant>,
        opened: &mut Option<ContextHandle>,
        trail: &mut Vec<NavigatorState>,
    ) -> Result<u32, EnrichmentError>
    where
        B: Browser + ?Sized,
    {
        let bound = || {
            let start = Instant::now();
            let own = start + self.navigation_timeout;
            let at = deadline.map_or(own, |d| d.min(own));
            (at, duration_ms(at.saturating_duration_since(start)))
        };

        enter(trail, NavigatorState::OpeningDetailContext, url);
        let (open_by, timeout_ms) = bound();
        let handle = match tokio::time::timeout_at(open_by, browser.open_context(url)).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(source)) => {
                return Err(EnrichmentError::OpenFailed {
                    url: url.to_owned(),
                    source,
                })
            }
            Err(_) => {
                return Err(EnrichmentError::OpenTimeout {
                    url: url.to_owned(),
                    timeout_ms,
                })
            }
        };
        *opened = Some(handle);
        browser
            .focus(handle)
            .await
            .map_err(|source| EnrichmentError::Transport {
                url: url.to_owned(),
                source,
            })?;

        enter(trail, NavigatorState::AwaitingDetailLoad, url);
        let (load_by, timeout_ms) = bound();
        let poll = async {
            loop {
                let html = browser
                    .content(handle)
                    .await
                    .map_err(|source| EnrichmentError::Transport {
                        url: url.to_owned(),
                        source,
                    })?;
                if is_ready(&html) {
                    return Ok::<_, EnrichmentError>(html);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };
        let html = tokio::time::timeout_at(load_by, poll)
            .await
            .map_err(|_| EnrichmentError::LoadTimeout {
                url: url.to_owned(),
                timeout_ms,
            })??;

        enter(trail, NavigatorState::ExtractingMetric, url);
        self.metric
            .extract(&html)
            .ok_or_else(|| EnrichmentError::NotFound {
                url: url.to_owned(),
            })
    }
}

fn enter(trail: &mut Vec<NavigatorState>, state: NavigatorState, url: &str) {
    tracing::trace!(url, ?state, "navigator transition");
    trail.push(state);
}

/// Close the secondary context, if any, then focus `primary`. Best effort:
/// failures are logged and swallowed.
async fn restore<B>(browser: &mut B, primary: ContextHandle, opened: Option<ContextHandle>)
where
    B: Browser + ?Sized,
{
    if let Some(handle) = opened {
        if let Err(e) = browser.close_context(handle).await {
            tracing::warn!(context = %handle, error = %e, "failed to close detail context");
        }
    }
    if let Err(e) = browser.focus(primary).await {
        tracing::warn!(context = %primary, error = %e, "failed to refocus primary context");
    }
}

/// A detail page is ready once its body renders some text.
fn is_ready(html: &str) -> bool {
    let document = Html::parse_document(html);
    let ready = document
        .select(&BODY)
        .next()
        .and_then(non_empty_text)
        .is_some();
    ready
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
