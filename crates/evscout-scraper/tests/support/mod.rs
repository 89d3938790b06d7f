//! Scripted [`Browser`] double shared by the integration tests.
//!
//! Pages are registered per URL with a behaviour; every call is recorded with
//! the (tokio) time it happened so tests can assert on ordering, pacing and
//! cleanup.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use evscout_scraper::{Browser, ContextHandle, CrawlSettings, TransportError};

pub const PRIMARY: ContextHandle = ContextHandle(0);

#[derive(Debug, Clone)]
pub enum Page {
    /// Serves this markup.
    Html(String),
    /// Fails with a server error when opened or rendered.
    Broken,
    /// Never finishes opening or rendering.
    Hang,
    /// Opens fine but renders an empty body forever.
    Blank,
    /// Opens fine, then panics when its content is read.
    Panics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Render(String),
    Open(String),
    Content(ContextHandle),
    Focus(ContextHandle),
    Close(ContextHandle),
}

pub struct ScriptedBrowser {
    pages: HashMap<String, Page>,
    contexts: BTreeMap<ContextHandle, String>,
    active: ContextHandle,
    next_handle: u32,
    calls: Vec<(Call, Instant)>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        let mut contexts = BTreeMap::new();
        contexts.insert(PRIMARY, "about:blank".to_string());
        Self {
            pages: HashMap::new(),
            contexts,
            active: PRIMARY,
            next_handle: 1,
            calls: Vec::new(),
        }
    }

    pub fn page(mut self, url: &str, page: Page) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn html(self, url: &str, html: &str) -> Self {
        self.page(url, Page::Html(html.to_string()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|(c, _)| c == call).count()
    }

    pub fn open_times(&self) -> Vec<Instant> {
        self.calls
            .iter()
            .filter(|(c, _)| matches!(c, Call::Open(_)))
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn network_times(&self) -> Vec<Instant> {
        self.calls
            .iter()
            .filter(|(c, _)| matches!(c, Call::Open(_) | Call::Render(_)))
            .map(|(_, at)| *at)
            .collect()
    }

    /// Open contexts, the primary one included.
    pub fn open_contexts(&self) -> usize {
        self.contexts.len()
    }

    fn record(&mut self, call: Call) {
        self.calls.push((call, Instant::now()));
    }

    fn lookup(&self, url: &str) -> Page {
        self.pages.get(url).cloned().unwrap_or(Page::Broken)
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn render(&mut self, url: &str) -> Result<String, TransportError> {
        self.record(Call::Render(url.to_string()));
        match self.lookup(url) {
            Page::Html(html) => {
                self.contexts.insert(PRIMARY, url.to_string());
                self.active = PRIMARY;
                Ok(html)
            }
            Page::Hang => std::future::pending().await,
            _ => Err(TransportError::UnexpectedStatus {
                status: 503,
                url: url.to_string(),
            }),
        }
    }

    fn active_context(&self) -> ContextHandle {
        self.active
    }

    async fn open_context(&mut self, url: &str) -> Result<ContextHandle, TransportError> {
        self.record(Call::Open(url.to_string()));
        match self.lookup(url) {
            Page::Broken => Err(TransportError::UnexpectedStatus {
                status: 500,
                url: url.to_string(),
            }),
            Page::Hang => std::future::pending().await,
            _ => {
                let handle = ContextHandle(self.next_handle);
                self.next_handle += 1;
                self.contexts.insert(handle, url.to_string());
                Ok(handle)
            }
        }
    }

    async fn content(&mut self, context: ContextHandle) -> Result<String, TransportError> {
        self.record(Call::Content(context));
        let url = self
            .contexts
            .get(&context)
            .cloned()
            .ok_or(TransportError::UnknownContext(context))?;
        match self.lookup(&url) {
            Page::Html(html) => Ok(html),
            Page::Blank => Ok("<html><body> </body></html>".to_string()),
            Page::Panics => panic!("renderer crashed on {url}"),
            Page::Broken | Page::Hang => Err(TransportError::UnknownContext(context)),
        }
    }

    async fn focus(&mut self, context: ContextHandle) -> Result<(), TransportError> {
        self.record(Call::Focus(context));
        if !self.contexts.contains_key(&context) {
            return Err(TransportError::UnknownContext(context));
        }
        self.active = context;
        Ok(())
    }

    async fn close_context(&mut self, context: ContextHandle) -> Result<(), TransportError> {
        self.record(Call::Close(context));
        if context == PRIMARY {
            return Err(TransportError::PrimaryContext);
        }
        self.contexts
            .remove(&context)
            .ok_or(TransportError::UnknownContext(context))?;
        if self.active == context {
            self.active = PRIMARY;
        }
        Ok(())
    }
}

/// No pacing, short timeouts, enrichment on.
pub fn fast_settings() -> CrawlSettings {
    CrawlSettings {
        min_request_delay: Duration::ZERO,
        navigation_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(50),
        run_timeout: None,
        enrich: true,
    }
}

pub fn detail_page(metric: &str) -> String {
    format!("<html><body><h1>Event</h1><div class=\"guests\">{metric}</div></body></html>")
}
