//! Environment variable names and parsing for runtime settings.

use crate::error::ConfigError;
use std::time::Duration;

pub(super) const ENV_SERVER: &str = "JH_SERVER";
pub(super) const ENV_CONFIG_PATH: &str = "JH_CONFIG";
pub(super) const ENV_HTTP_TIMEOUT_SECS: &str = "JH_HTTP_TIMEOUT_SECS";
pub(super) const ENV_NO_BROWSER: &str = "JH_NO_BROWSER";
pub(super) const ENV_JULIA_DEPOT_PATH: &str = "JULIA_DEPOT_PATH";

pub(super) const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Non-empty, trimmed value of `name`.
pub(super) fn env_value<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(super) fn http_timeout_with<FEnv>(env_lookup: &FEnv) -> Result<Duration, ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    let Some(raw) = env_value(env_lookup, ENV_HTTP_TIMEOUT_SECS) else {
        return Ok(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
    };
    // Clamp to at least 1 second to avoid "no-timeout" accidental behavior.
    let secs = raw.parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!(
            "invalid {ENV_HTTP_TIMEOUT_SECS} value `{raw}`: expected positive integer seconds"
        ))
    })?;
    Ok(Duration::from_secs(secs.max(1)))
}

pub(super) fn browser_enabled_with<FEnv>(env_lookup: &FEnv) -> bool
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_value(env_lookup, ENV_NO_BROWSER).is_none()
}
