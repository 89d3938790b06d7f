//! Artifact persistence.

use std::path::{Path, PathBuf};

use evscout_core::Period;

use crate::error::ArtifactError;
use crate::types::ExtractionResult;

/// `<dir>/events_<period>.json`
#[must_use]
pub fn artifact_path(dir: &Path, period: Period) -> PathBuf {
    dir.join(format!("events_{period}.json"))
}

/// Write `result` as pretty JSON to `path`.
///
/// The parent directory is created if needed. Content goes to a sibling
/// temporary file first and is renamed into place, so readers never see a
/// half-written artifact.
///
/// # Errors
///
/// Returns [`ArtifactError`] if serialization or any filesystem step fails.
pub fn write_artifact(path: &Path, result: &ExtractionResult) -> Result<(), ArtifactError> {
    let io_err = |source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    };

    let json = serde_json::to_string_pretty(result)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    std::fs::write(&staging, json).map_err(io_err)?;
    if let Err(e) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(io_err(e));
    }

    tracing::info!(
        path = %path.display(),
        events = result.events.len(),
        "wrote artifact"
    );
    Ok(())
}
