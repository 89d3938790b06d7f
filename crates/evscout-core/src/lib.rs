//! Shared configuration and domain types for the evscout workspace.

pub mod app_config;
pub mod config;
pub mod profile;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use profile::{load_profile, ExtractionProfile, ListingTarget, Period};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read profile file {path}: {source}")]
    ProfileFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile file: {0}")]
    ProfileFileParse(#[source] serde_yaml::Error),

    #[error("invalid profile: {0}")]
    Validation(String),
}
