use thiserror::Error;

use crate::browser::ContextHandle;

/// A listing or detail page could not be fetched or rendered.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("{url} returned an empty page or a bot challenge")]
    UnusableBody { url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no browsing context {0}")]
    UnknownContext(ContextHandle),

    #[error("the primary browsing context cannot be closed")]
    PrimaryContext,
}

/// A strategy could not be evaluated against a document.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("strategy {strategy} has an invalid selector \"{selector}\": {reason}")]
    InvalidSelector {
        strategy: String,
        selector: String,
        reason: String,
    },
}

/// A candidate could not produce an acceptable title and is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldValidationFailure {
    #[error("candidate has no title")]
    MissingTitle,

    #[error("title \"{title}\" is not longer than {min} characters")]
    TitleTooShort { title: String, min: usize },

    #[error("title \"{title}\" matches no topical keyword")]
    OffTopicTitle { title: String },
}

/// Why one detail-page enrichment produced no metric.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("could not open detail context for {url}: {source}")]
    OpenFailed {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("detail context for {url} did not open within {timeout_ms}ms")]
    OpenTimeout { url: String, timeout_ms: u64 },

    #[error("detail page {url} was not ready within {timeout_ms}ms")]
    LoadTimeout { url: String, timeout_ms: u64 },

    #[error("transport failure while reading {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("no attendance figure found on {url}")]
    NotFound { url: String },

    #[error("enrichment of {url} panicked")]
    Faulted { url: String },
}

impl EnrichmentError {
    /// `true` when the page loaded fine but simply carried no metric.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, EnrichmentError::NotFound { .. })
    }
}

/// The pipeline could not be assembled from its configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("at least one metric keyword is required")]
    NoMetricKeywords,

    #[error("invalid metric pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The run artifact could not be persisted.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to write artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A run could not get past the listing page. Recorded in the artifact's
/// `debug.error`; never propagated out of the controller.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid listing target: {0}")]
    Target(#[from] evscout_core::ConfigError),

    #[error("listing page unavailable: {0}")]
    Listing(#[from] TransportError),

    #[error("run timed out after {limit_secs}s")]
    TimedOut { limit_secs: u64 },
}
