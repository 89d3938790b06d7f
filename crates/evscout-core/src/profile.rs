//! Extraction profile: which listings to crawl and the keyword allowlists the
//! extraction heuristics validate against.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Which listing view produced an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Past,
    Upcoming,
    #[default]
    Unknown,
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Past => write!(f, "past"),
            Period::Upcoming => write!(f, "upcoming"),
            Period::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for Period {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "past" => Ok(Period::Past),
            "upcoming" => Ok(Period::Upcoming),
            "unknown" => Ok(Period::Unknown),
            other => Err(ConfigError::Validation(format!(
                "unknown period '{other}'; expected past, upcoming or unknown"
            ))),
        }
    }
}

/// One listing page to crawl and the period tag attached to its events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingTarget {
    pub url: String,
    #[serde(default)]
    pub period: Period,
}

impl ListingTarget {
    #[must_use]
    pub fn new(url: impl Into<String>, period: Period) -> Self {
        Self {
            url: url.into(),
            period,
        }
    }

    /// Scheme + host of the listing URL, used to resolve relative event links.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the URL is not absolute http(s).
    pub fn base_origin(&self) -> Result<String, ConfigError> {
        let parsed = url::Url::parse(&self.url).map_err(|e| {
            ConfigError::Validation(format!("target url '{}' is invalid: {e}", self.url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ConfigError::Validation(format!(
                "target url '{}' must be an absolute http(s) URL",
                self.url
            )));
        }
        Ok(parsed.origin().ascii_serialization())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionProfile {
    pub targets: Vec<ListingTarget>,
    /// Substrings of an event detail link's path, e.g. `/event/`.
    pub event_path_markers: Vec<String>,
    /// Terms a title must contain when no event card was confirmed.
    pub topical_keywords: Vec<String>,
    /// Terms a location must contain when no event card was confirmed.
    pub venue_keywords: Vec<String>,
    /// Words that follow the attendance number on a detail page.
    pub metric_keywords: Vec<String>,
    /// CSS selectors tried before the built-in strategies.
    pub extra_selectors: Vec<String>,
    pub min_title_len: usize,
    pub max_time_len: usize,
}

impl Default for ExtractionProfile {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();
        Self {
            targets: Vec::new(),
            event_path_markers: owned(&["/event/", "/e/"]),
            topical_keywords: owned(&[
                "ai",
                "machine learning",
                "meetup",
                "hackathon",
                "workshop",
                "llm",
                "data",
                "talk",
            ]),
            venue_keywords: owned(&[
                "venue", "street", "st.", "ave", "road", "hall", "centre", "center", "room",
                "floor", "building", "university", "library", "cafe", "online", "virtual",
            ]),
            metric_keywords: owned(&["went", "going", "attended", "attendees", "guests"]),
            extra_selectors: Vec::new(),
            min_title_len: 10,
            max_time_len: 30,
        }
    }
}

/// Load and validate an extraction profile from a YAML file.
///
/// Missing keys fall back to [`ExtractionProfile::default`].
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_profile(path: &Path) -> Result<ExtractionProfile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProfileFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let profile: ExtractionProfile =
        serde_yaml::from_str(&content).map_err(ConfigError::ProfileFileParse)?;

    validate_profile(&profile)?;

    Ok(profile)
}

/// Check the invariants the extraction pipeline relies on.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] describing the first violation found.
pub fn validate_profile(profile: &ExtractionProfile) -> Result<(), ConfigError> {
    if profile.targets.is_empty() {
        return Err(ConfigError::Validation(
            "profile must list at least one target".to_string(),
        ));
    }

    let mut seen_urls = HashSet::new();
    for target in &profile.targets {
        target.base_origin()?;
        if !seen_urls.insert(target.url.trim_end_matches('/').to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate target url: '{}'",
                target.url
            )));
        }
    }

    let lists = [
        ("event_path_markers", &profile.event_path_markers),
        ("topical_keywords", &profile.topical_keywords),
        ("venue_keywords", &profile.venue_keywords),
        ("metric_keywords", &profile.metric_keywords),
        ("extra_selectors", &profile.extra_selectors),
    ];
    for (name, items) in lists {
        if items.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{name} must not contain empty entries"
            )));
        }
    }

    if profile.metric_keywords.is_empty() {
        return Err(ConfigError::Validation(
            "metric_keywords must list at least one keyword".to_string(),
        ));
    }

    if profile.max_time_len == 0 {
        return Err(ConfigError::Validation(
            "max_time_len must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn profile_with(targets: Vec<ListingTarget>) -> ExtractionProfile {
        ExtractionProfile {
            targets,
            ..ExtractionProfile::default()
        }
    }

    #[test]
    fn period_round_trips_through_display_and_from_str() {
        for period in [Period::Past, Period::Upcoming, Period::Unknown] {
            assert_eq!(period.to_string().parse::<Period>().unwrap(), period);
        }
    }

    #[test]
    fn period_from_str_rejects_unknown_word() {
        assert!("someday".parse::<Period>().is_err());
    }

    #[test]
    fn base_origin_strips_path() {
        let target = ListingTarget::new("https://lu.ma/mlto?tab=past", Period::Past);
        assert_eq!(target.base_origin().unwrap(), "https://lu.ma");
    }

    #[test]
    fn base_origin_rejects_relative_url() {
        let target = ListingTarget::new("/mlto", Period::Unknown);
        assert!(target.base_origin().is_err());
    }

    #[test]
    fn validate_rejects_empty_targets() {
        let err = validate_profile(&profile_with(vec![])).unwrap_err();
        assert!(err.to_string().contains("at least one target"));
    }

    #[test]
    fn validate_rejects_duplicate_targets() {
        let profile = profile_with(vec![
            ListingTarget::new("https://lu.ma/mlto", Period::Upcoming),
            ListingTarget::new("https://lu.ma/mlto/", Period::Past),
        ]);
        let err = validate_profile(&profile).unwrap_err();
        assert!(err.to_string().contains("duplicate target url"));
    }

    #[test]
    fn validate_rejects_blank_keyword() {
        let mut profile = profile_with(vec![ListingTarget::new(
            "https://lu.ma/mlto",
            Period::Upcoming,
        )]);
        profile.venue_keywords.push("   ".to_string());
        let err = validate_profile(&profile).unwrap_err();
        assert!(err.to_string().contains("venue_keywords"));
    }

    #[test]
    fn validate_rejects_missing_metric_keywords() {
        let mut profile = profile_with(vec![ListingTarget::new(
            "https://lu.ma/mlto",
            Period::Upcoming,
        )]);
        profile.metric_keywords.clear();
        assert!(validate_profile(&profile).is_err());
    }

    #[test]
    fn load_profile_fills_defaults_for_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "targets:\n  - url: https://lu.ma/mlto\n    period: upcoming\n  - url: https://lu.ma/mlto?period=past\n    period: past\nmin_title_len: 12\n"
        )
        .unwrap();

        let profile = load_profile(file.path()).unwrap();
        assert_eq!(profile.targets.len(), 2);
        assert_eq!(profile.targets[1].period, Period::Past);
        assert_eq!(profile.min_title_len, 12);
        assert_eq!(
            profile.metric_keywords,
            ExtractionProfile::default().metric_keywords
        );
    }

    #[test]
    fn load_profile_reports_missing_file() {
        let err = load_profile(Path::new("/nonexistent/evscout/profile.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ProfileFileIo { .. }));
    }

    #[test]
    fn load_profile_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "targets: [{{ url: https://lu.ma/x, period: sometime }}]").unwrap();
        let err = load_profile(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ProfileFileParse(_)));
    }
}
