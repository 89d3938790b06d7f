use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let log_level = or_default("EVSCOUT_LOG_LEVEL", "info");
    let profile_path = PathBuf::from(or_default("EVSCOUT_PROFILE_PATH", "./config/profile.yaml"));
    let output_dir = PathBuf::from(or_default("EVSCOUT_OUTPUT_DIR", "./data"));
    let user_agent = or_default("EVSCOUT_USER_AGENT", "evscout/0.1 (event-listing-crawler)");

    let request_timeout_secs = parse_u64("EVSCOUT_REQUEST_TIMEOUT_SECS", "30")?;
    let min_request_delay_ms = parse_u64("EVSCOUT_MIN_REQUEST_DELAY_MS", "5000")?;
    let navigation_timeout_secs = parse_u64("EVSCOUT_NAVIGATION_TIMEOUT_SECS", "15")?;
    let max_retries = parse_u32("EVSCOUT_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("EVSCOUT_RETRY_BACKOFF_BASE_SECS", "2")?;

    if navigation_timeout_secs == 0 {
        return Err(invalid(
            "EVSCOUT_NAVIGATION_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let run_timeout_secs = match lookup("EVSCOUT_RUN_TIMEOUT_SECS") {
        Ok(raw) if !raw.trim().is_empty() => Some(
            raw.trim()
                .parse::<u64>()
                .map_err(|e| invalid("EVSCOUT_RUN_TIMEOUT_SECS", e.to_string()))?,
        ),
        _ => None,
    };

    let enrich = parse_bool(&or_default("EVSCOUT_ENRICH", "true"))
        .ok_or_else(|| invalid("EVSCOUT_ENRICH", "expected true or false".to_string()))?;

    Ok(AppConfig {
        log_level,
        profile_path,
        output_dir,
        user_agent,
        request_timeout_secs,
        min_request_delay_ms,
        navigation_timeout_secs,
        max_retries,
        retry_backoff_base_secs,
        run_timeout_secs,
        enrich,
    })
}

/// Parse the boolean spellings accepted in env vars.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
