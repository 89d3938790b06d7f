//! Command handlers for `crawl` and `check-profile`.
//!
//! Targets are crawled one after another over a single browser session. A
//! failed run still yields an artifact; only failing to write one makes the
//! command fail.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use evscout_core::{AppConfig, ExtractionProfile, ListingTarget, Period};
use evscout_scraper::locator::StrategyChain;
use evscout_scraper::{
    artifact_path, write_artifact, CrawlController, CrawlSettings, HttpBrowser, MetricExtractor,
};

#[derive(Debug)]
pub(crate) struct CrawlArgs {
    pub url: Option<String>,
    pub period: Period,
    pub output_dir: Option<PathBuf>,
    pub no_enrich: bool,
}

/// Crawl the configured targets and write one artifact per target.
///
/// # Errors
///
/// Returns an error if the profile or HTTP client cannot be set up, or if any
/// artifact could not be written. Failed runs are not errors: their artifact
/// carries the failure in `debug.error`.
pub(crate) async fn run_crawl(config: &AppConfig, args: CrawlArgs) -> anyhow::Result<()> {
    let (profile, targets) = resolve_targets(config, args.url, args.period)?;

    let mut settings = CrawlSettings::from_config(config);
    if args.no_enrich {
        settings.enrich = false;
    }

    let browser = HttpBrowser::new(
        config.request_timeout_secs,
        &config.user_agent,
        config.max_retries,
        config.retry_backoff_base_secs,
    )?;
    let mut controller = CrawlController::new(browser, &profile, settings)?;

    let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir.clone());
    let mut names = ArtifactNames::default();
    let mut write_failures = 0usize;

    for target in &targets {
        let result = controller.run(target).await;
        let path = names.next(&output_dir, target.period);

        if let Err(e) = write_artifact(&path, &result) {
            tracing::error!(
                url = %target.url,
                path = %path.display(),
                error = %e,
                "failed to write artifact"
            );
            write_failures += 1;
            continue;
        }

        let status = match (&result.debug.error, result.debug.partial) {
            (Some(_), true) => "partial",
            (Some(_), false) => "failed",
            (None, _) => "ok",
        };
        println!(
            "{status}: {} -> {} ({} events, {} enriched, strategy {})",
            target.url,
            path.display(),
            result.debug.events_extracted,
            result.debug.events_enriched,
            result.debug.strategy_used
        );
    }

    if write_failures > 0 {
        anyhow::bail!(
            "{write_failures} of {} artifacts could not be written",
            targets.len()
        );
    }
    Ok(())
}

/// Load and validate the profile, then print what a crawl would do.
///
/// # Errors
///
/// Returns an error if the profile cannot be loaded or fails validation.
pub(crate) fn check_profile(config: &AppConfig) -> anyhow::Result<()> {
    let profile = evscout_core::load_profile(&config.profile_path)?;
    MetricExtractor::new(&profile.metric_keywords)?;

    println!("profile: {}", config.profile_path.display());
    println!("targets:");
    for target in &profile.targets {
        println!("  [{}] {}", target.period, target.url);
    }
    println!(
        "strategies: {}",
        StrategyChain::from_profile(&profile)
            .strategy_names()
            .join(" -> ")
    );
    println!("output: {}", config.output_dir.display());
    Ok(())
}

/// The profile plus the targets to crawl. A `--url` override replaces the
/// profile's targets; the profile file is then optional.
fn resolve_targets(
    config: &AppConfig,
    url: Option<String>,
    period: Period,
) -> anyhow::Result<(ExtractionProfile, Vec<ListingTarget>)> {
    let Some(url) = url else {
        let profile = evscout_core::load_profile(&config.profile_path)?;
        let targets = profile.targets.clone();
        return Ok((profile, targets));
    };

    let profile = if config.profile_path.exists() {
        evscout_core::load_profile(&config.profile_path)?
    } else {
        tracing::info!(
            path = %config.profile_path.display(),
            "profile not found; using built-in defaults"
        );
        ExtractionProfile::default()
    };

    let target = ListingTarget::new(url, period);
    target.base_origin()?;
    Ok((profile, vec![target]))
}

/// Hands out `events_<period>.json`, then `events_<period>_2.json`, ... when
/// several targets share a period.
#[derive(Debug, Default)]
struct ArtifactNames {
    seen: HashMap<Period, usize>,
}

impl ArtifactNames {
    fn next(&mut self, dir: &Path, period: Period) -> PathBuf {
        let n = self.seen.entry(period).or_insert(0);
        *n += 1;
        if *n == 1 {
            artifact_path(dir, period)
        } else {
            dir.join(format!("events_{period}_{n}.json"))
        }
    }
}
