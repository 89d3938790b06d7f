use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub profile_path: PathBuf,
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Minimum interval between two network-facing operations.
    pub min_request_delay_ms: u64,
    /// Upper bound for opening a detail context and for its readiness wait.
    pub navigation_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    /// Whole-run deadline; `None` lets a run take as long as it needs.
    pub run_timeout_secs: Option<u64>,
    pub enrich: bool,
}
