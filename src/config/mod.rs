//! Runtime configuration for the active JuliaHub identity.
//!
//! The server is resolved in this order of precedence (highest wins):
//! 1. `--server` CLI flag
//! 2. `JH_SERVER` environment variable
//! 3. `server=` line of the primary store (`JH_CONFIG` or `~/.juliahub`)
//! 4. Built-in default `juliahub.com`
//!
//! The resolved `AuthConfig` is passed explicitly to every component; nothing
//! downstream reads the environment for identity.

use crate::auth::{normalize_server, CredentialProjector, TokenStore};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod env;

use env::{
    browser_enabled_with, env_value, http_timeout_with, ENV_CONFIG_PATH, ENV_JULIA_DEPOT_PATH,
    ENV_SERVER,
};

/// Default primary store file name under the home directory.
pub const DEFAULT_STORE_FILE: &str = ".juliahub";

/// Fully resolved settings for one process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Normalized active server, e.g. `juliahub.com`.
    pub server: String,
    pub store_path: PathBuf,
    /// Raw `JULIA_DEPOT_PATH`; only its first entry is used.
    pub depot_override: Option<String>,
    pub home_dir: Option<PathBuf>,
    pub http_timeout: Duration,
    pub open_browser: bool,
}

impl AuthConfig {
    pub fn store(&self) -> TokenStore {
        TokenStore::new(&self.store_path)
    }

    pub fn projector(&self) -> CredentialProjector {
        CredentialProjector::new(self.depot_override.as_deref(), self.home_dir.as_deref())
    }
}

/// Load configuration from the process environment.
pub fn load_config(server_flag: Option<&str>) -> Result<AuthConfig, ConfigError> {
    load_config_from_sources(server_flag, |name| std::env::var(name).ok(), dirs::home_dir)
}

fn load_config_from_sources<FEnv, FHome>(
    server_flag: Option<&str>,
    env_lookup: FEnv,
    home_dir: FHome,
) -> Result<AuthConfig, ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
    FHome: Fn() -> Option<PathBuf>,
{
    let home_dir = home_dir();
    let store_path = resolve_store_path(&env_lookup, home_dir.as_deref())?;
    let server = resolve_server(server_flag, &env_lookup, &store_path);
    let config = AuthConfig {
        server,
        store_path,
        depot_override: env_value(&env_lookup, ENV_JULIA_DEPOT_PATH),
        home_dir,
        http_timeout: http_timeout_with(&env_lookup)?,
        open_browser: browser_enabled_with(&env_lookup),
    };
    tracing::debug!(
        server = %config.server,
        store = %config.store_path.display(),
        "configuration resolved"
    );
    Ok(config)
}

fn resolve_store_path<FEnv>(env_lookup: &FEnv, home: Option<&Path>) -> Result<PathBuf, ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(path) = env_value(env_lookup, ENV_CONFIG_PATH) {
        return Ok(PathBuf::from(path));
    }
    home.map(|home| home.join(DEFAULT_STORE_FILE)).ok_or_else(|| {
        ConfigError::Invalid(format!(
            "unable to resolve home directory; set {ENV_CONFIG_PATH} to choose a store path"
        ))
    })
}

fn resolve_server<FEnv>(server_flag: Option<&str>, env_lookup: &FEnv, store_path: &Path) -> String
where
    FEnv: Fn(&str) -> Option<String>,
{
    let explicit = server_flag
        .map(str::trim)
        .filter(|server| !server.is_empty())
        .map(str::to_string)
        .or_else(|| env_value(env_lookup, ENV_SERVER));
    if let Some(server) = explicit {
        return normalize_server(&server);
    }
    match TokenStore::new(store_path).configured_server() {
        Ok(Some(server)) => normalize_server(&server),
        Ok(None) => normalize_server(""),
        Err(err) => {
            // An unreadable store must not block the helper; identity falls back.
            tracing::warn!(error = %err, "ignoring unreadable store while resolving server");
            normalize_server("")
        }
    }
}
