//! The page transport boundary.
//!
//! The pipeline only needs "a navigable document for a URL" plus, for
//! enrichment, the ability to open, read, focus and close a secondary context
//! without disturbing the primary one. [`Browser`] captures exactly that, so a
//! static HTTP fetcher ([`HttpBrowser`]) and a script-executing driver can be
//! swapped without touching the extraction code.

mod http;

pub use http::HttpBrowser;

use async_trait::async_trait;

use crate::error::TransportError;

/// Opaque identifier of one browsing context (a tab, in browser terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextHandle(pub u32);

impl std::fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

#[async_trait]
pub trait Browser: Send {
    /// Navigate the primary context to `url` and return its rendered markup.
    async fn render(&mut self, url: &str) -> Result<String, TransportError>;

    /// The context subsequent reads and navigations apply to.
    fn active_context(&self) -> ContextHandle;

    /// Open a new secondary context on `url`. Does not change focus.
    async fn open_context(&mut self, url: &str) -> Result<ContextHandle, TransportError>;

    /// Current markup of `context`.
    async fn content(&mut self, context: ContextHandle) -> Result<String, TransportError>;

    /// Make `context` the active one.
    async fn focus(&mut self, context: ContextHandle) -> Result<(), TransportError>;

    /// Close a secondary context. If it was active, focus falls back to the
    /// primary context.
    async fn close_context(&mut self, context: ContextHandle) -> Result<(), TransportError>;
}
