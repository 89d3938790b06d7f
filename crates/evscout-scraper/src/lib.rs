pub mod artifact;
pub mod assemble;
pub mod browser;
pub mod controller;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod locator;
pub mod metric;
pub mod rate_limit;
mod text;
pub mod types;
pub mod urls;

pub use artifact::{artifact_path, write_artifact};
pub use assemble::assemble;
pub use browser::{Browser, ContextHandle, HttpBrowser};
pub use controller::{CrawlController, CrawlSettings};
pub use enrich::{EnrichmentNavigator, EnrichmentOutcome, NavigatorState};
pub use error::{
    ArtifactError, EnrichmentError, FieldValidationFailure, LocateError, RunError, SetupError,
    TransportError,
};
pub use extract::{FieldExtractor, FieldRules};
pub use locator::{ExtractionContext, LocatorStrategy, StrategyChain};
pub use metric::MetricExtractor;
pub use rate_limit::Pacer;
pub use types::{DebugInfo, EventDraft, EventRecord, ExtractionResult, RunDiagnostics};
pub use urls::resolve_event_url;
