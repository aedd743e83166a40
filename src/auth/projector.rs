//! Projection of the stored credential into per-server Julia `auth.toml`
//! files read by the package manager.
//!
//! The stored token is the only source of truth; these files are derived
//! from it and written only here, through `atomic::write_private_atomic`.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::atomic::{ensure_private_dir, write_private_atomic};
use super::error::AuthError;
use super::jwt;
use super::server::token_url;
use super::types::StoredToken;

const AUTH_FILE_NAME: &str = "auth.toml";

/// Fixed `auth.toml` schema, serialized in field order.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct JuliaAuthFile<'a> {
    expires_at: i64,
    id_token: &'a str,
    access_token: &'a str,
    refresh_token: &'a str,
    refresh_url: String,
    expires_in: i64,
    user_email: &'a str,
    expires: i64,
    user_name: &'a str,
    name: &'a str,
}

/// Writes external credential files under a Julia depot.
#[derive(Debug, Clone)]
pub struct CredentialProjector {
    depot: Option<PathBuf>,
}

impl CredentialProjector {
    /// Build from the raw `JULIA_DEPOT_PATH` value and the user's home dir.
    ///
    /// Only the first depot entry is used; without one the depot defaults to
    /// `~/.julia`.
    pub fn new(depot_override: Option<&str>, home_dir: Option<&Path>) -> Self {
        let first_entry = depot_override.and_then(|raw| {
            std::env::split_paths(raw).find(|path| !path.as_os_str().is_empty())
        });
        let depot = first_entry.or_else(|| home_dir.map(|home| home.join(".julia")));
        Self { depot }
    }

    /// Depot root the projector writes under, when one could be resolved.
    pub fn depot(&self) -> Option<&Path> {
        self.depot.as_deref()
    }

    /// `<depot>/servers/<server>/auth.toml`.
    pub fn target_path(&self, server: &str) -> Result<PathBuf, AuthError> {
        let depot = self.depot.as_ref().ok_or_else(|| {
            AuthError::ProjectionFailed("unable to resolve Julia depot directory".to_string())
        })?;
        let server = server.trim();
        if server.is_empty() || server.contains(['/', '\\']) || server.starts_with('.') {
            return Err(AuthError::ProjectionFailed(format!(
                "invalid server name `{server}`"
            )));
        }
        Ok(depot.join("servers").join(server).join(AUTH_FILE_NAME))
    }

    /// Explicit setup: create or overwrite the target and surface failures.
    pub fn setup(&self, server: &str, token: &StoredToken) -> Result<PathBuf, AuthError> {
        let path = self.target_path(server)?;
        self.write_target(&path, server, token)?;
        tracing::info!(path = %path.display(), "credential file written");
        Ok(path)
    }

    /// Refresh path: update the target only if it already exists. Failures
    /// are logged and swallowed. Returns the path when a file was updated.
    pub fn sync_existing(&self, server: &str, token: &StoredToken) -> Option<PathBuf> {
        let path = match self.target_path(server) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(server, error = %err, "skipping credential file sync");
                return None;
            }
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "credential file absent; not creating");
            return None;
        }
        self.best_effort(&path, server, token)
    }

    /// Login path: create or update the target. Failures are logged and
    /// swallowed so a login never fails on a downstream consumer.
    pub fn sync_after_login(&self, server: &str, token: &StoredToken) -> Option<PathBuf> {
        match self.target_path(server) {
            Ok(path) => self.best_effort(&path, server, token),
            Err(err) => {
                tracing::warn!(server, error = %err, "skipping credential file sync");
                None
            }
        }
    }

    fn best_effort(&self, path: &Path, server: &str, token: &StoredToken) -> Option<PathBuf> {
        match self.write_target(path, server, token) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "credential file synced");
                Some(path.to_path_buf())
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "credential file sync failed");
                None
            }
        }
    }

    fn write_target(&self, path: &Path, server: &str, token: &StoredToken) -> Result<(), AuthError> {
        let content = render_auth_file(server, token)?;
        if let Some(dir) = path.parent() {
            ensure_private_dir(dir).map_err(|err| {
                AuthError::ProjectionFailed(format!("create `{}`: {err}", dir.display()))
            })?;
        }
        write_private_atomic(path, content.as_bytes()).map_err(|err| {
            AuthError::ProjectionFailed(format!("write `{}`: {err}", path.display()))
        })
    }
}

/// Render the `auth.toml` body for `token` on `server`.
pub(crate) fn render_auth_file(server: &str, token: &StoredToken) -> Result<String, AuthError> {
    let id_claims = jwt::decode(&token.id_token).ok();
    let access_claims = jwt::decode(&token.access_token).ok();
    let expires_at = id_claims
        .as_ref()
        .filter(|claims| claims.exp > 0)
        .map(|claims| claims.exp)
        .or_else(|| {
            access_claims
                .as_ref()
                .and_then(|claims| claims.expires_at(token.expires_in))
        })
        .ok_or_else(|| {
            AuthError::ProjectionFailed("stored token carries no usable expiry".to_string())
        })?;
    let user_name = id_claims
        .as_ref()
        .and_then(|claims| claims.preferred_username())
        .unwrap_or_default();

    let file = JuliaAuthFile {
        expires_at,
        id_token: &token.id_token,
        access_token: &token.access_token,
        refresh_token: &token.refresh_token,
        refresh_url: token_url(server),
        expires_in: token.expires_in,
        user_email: &token.email,
        expires: expires_at,
        user_name,
        name: &token.name,
    };
    toml::to_string(&file)
        .map_err(|err| AuthError::ProjectionFailed(format!("render auth.toml: {err}")))
}
