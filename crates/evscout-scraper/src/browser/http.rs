//! Static-HTML transport over `reqwest`.
//!
//! Each context is an in-memory tab holding the markup fetched for it. Pages
//! that need client-side rendering will come back thin; the extraction chain
//! degrades to its generic strategies in that case.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Browser, ContextHandle};
use crate::error::{SetupError, TransportError};
use crate::rate_limit::retry_with_backoff;

const PRIMARY: ContextHandle = ContextHandle(0);

#[derive(Debug)]
struct Tab {
    url: String,
    html: String,
}

/// HTTP-backed [`Browser`]: the primary context is created up front, secondary
/// contexts are created by fetching their URL.
///
/// Transient failures (network errors, 429, 5xx) are retried with exponential
/// backoff up to `max_retries` additional attempts.
pub struct HttpBrowser {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
    tabs: BTreeMap<ContextHandle, Tab>,
    active: ContextHandle,
    next_handle: u32,
}

impl HttpBrowser {
    /// Creates a browser with the given request timeout, `User-Agent`, and
    /// retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Client`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, SetupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let mut tabs = BTreeMap::new();
        tabs.insert(
            PRIMARY,
            Tab {
                url: "about:blank".to_string(),
                html: String::new(),
            },
        );

        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
            tabs,
            active: PRIMARY,
            next_handle: PRIMARY.0 + 1,
        })
    }

    /// URL currently loaded in `context`, if the context exists.
    #[must_use]
    pub fn context_url(&self, context: ContextHandle) -> Option<&str> {
        self.tabs.get(&context).map(|t| t.url.as_str())
    }

    /// Number of open contexts, the primary one included.
    #[must_use]
    pub fn open_contexts(&self) -> usize {
        self.tabs.len()
    }

    async fn fetch_html(&self, url: &str) -> Result<String, TransportError> {
        reqwest::Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
                .send()
                .await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(TransportError::RateLimited {
                    url: url.to_owned(),
                    retry_after_secs,
                });
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(TransportError::NotFound {
                    url: url.to_owned(),
                });
            }
            if !status.is_success() {
                return Err(TransportError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            let body = response.text().await?;
            if !is_usable_html(&body) {
                return Err(TransportError::UnusableBody {
                    url: url.to_owned(),
                });
            }
            Ok(body)
        })
        .await
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn render(&mut self, url: &str) -> Result<String, TransportError> {
        let html = self.fetch_html(url).await?;
        tracing::debug!(url, bytes = html.len(), "rendered listing into primary context");
        self.tabs.insert(
            PRIMARY,
            Tab {
                url: url.to_owned(),
                html: html.clone(),
            },
        );
        self.active = PRIMARY;
        Ok(html)
    }

    fn active_context(&self) -> ContextHandle {
        self.active
    }

    async fn open_context(&mut self, url: &str) -> Result<ContextHandle, TransportError> {
        let html = self.fetch_html(url).await?;
        let handle = ContextHandle(self.next_handle);
        self.next_handle += 1;
        self.tabs.insert(
            handle,
            Tab {
                url: url.to_owned(),
                html,
            },
        );
        tracing::trace!(url, context = %handle, "opened secondary context");
        Ok(handle)
    }

    async fn content(&mut self, context: ContextHandle) -> Result<String, TransportError> {
        self.tabs
            .get(&context)
            .map(|t| t.html.clone())
            .ok_or(TransportError::UnknownContext(context))
    }

    async fn focus(&mut self, context: ContextHandle) -> Result<(), TransportError> {
        if !self.tabs.contains_key(&context) {
            return Err(TransportError::UnknownContext(context));
        }
        self.active = context;
        Ok(())
    }

    async fn close_context(&mut self, context: ContextHandle) -> Result<(), TransportError> {
        if context == PRIMARY {
            return Err(TransportError::PrimaryContext);
        }
        if self.tabs.remove(&context).is_none() {
            return Err(TransportError::UnknownContext(context));
        }
        if self.active == context {
            self.active = PRIMARY;
        }
        Ok(())
    }
}

fn is_usable_html(body: &str) -> bool {
    let trimmed = body.trim();
    !trimmed.is_empty() && !looks_like_bot_challenge(trimmed)
}

fn looks_like_bot_challenge(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    let has_cloudflare_banner = lowered.contains("attention required! | cloudflare");
    let has_challenge_platform = lowered.contains("/cdn-cgi/challenge-platform/");
    let has_just_a_moment = lowered.contains("just a moment...");
    let has_cookie_gate = lowered.contains("please enable cookies");
    let has_cf_chl = lowered.contains("cf-chl-");

    has_cloudflare_banner
        || has_challenge_platform
        || (has_just_a_moment && has_cookie_gate)
        || (has_just_a_moment && has_cf_chl)
}
