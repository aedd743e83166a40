//! Primary credential store.
//!
//! One record per file, `key=value` per line:
//!
//! ```text
//! server=juliahub.com
//! access_token=...
//! refresh_token=...
//! token_type=bearer
//! expires_in=86399
//! id_token=...
//! name=Ada Lovelace
//! email=ada@example.com
//! ```
//!
//! Unknown keys are ignored on read. Writes always replace the whole record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::atomic::{ensure_private_dir, write_private_atomic};
use super::error::AuthError;
use super::types::StoredToken;

/// Keys written by `TokenStore::write`, in file order.
const STORE_KEYS: [&str; 8] = [
    "server",
    "access_token",
    "refresh_token",
    "token_type",
    "expires_in",
    "id_token",
    "name",
    "email",
];

/// File-backed store holding the single active credential.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored record. Missing files and records without an access
    /// token both read as `NoStoredToken`.
    pub fn read(&self) -> Result<StoredToken, AuthError> {
        let Some(fields) = self.read_fields()? else {
            return Err(AuthError::NoStoredToken);
        };
        let field = |key: &str| fields.get(key).cloned().unwrap_or_default();

        let access_token = field("access_token");
        if access_token.is_empty() {
            return Err(AuthError::NoStoredToken);
        }
        let expires_in = match fields.get("expires_in") {
            Some(raw) if !raw.is_empty() => raw.parse::<i64>().map_err(|err| {
                AuthError::Invalid(format!(
                    "invalid expires_in `{raw}` in `{}`: {err}",
                    self.path.display()
                ))
            })?,
            _ => 0,
        };
        Ok(StoredToken {
            server: field("server"),
            access_token,
            refresh_token: field("refresh_token"),
            token_type: field("token_type"),
            expires_in,
            id_token: field("id_token"),
            name: field("name"),
            email: field("email"),
        })
    }

    /// The `server=` setting, present even when no token is stored.
    pub fn configured_server(&self) -> Result<Option<String>, AuthError> {
        Ok(self
            .read_fields()?
            .and_then(|fields| fields.get("server").cloned())
            .filter(|server| !server.is_empty()))
    }

    /// Replace the stored record with `token`, scoped to `server`.
    pub fn write(&self, server: &str, token: &StoredToken) -> Result<(), AuthError> {
        let expires_in = token.expires_in.to_string();
        let values = [
            server,
            token.access_token.as_str(),
            token.refresh_token.as_str(),
            token.token_type.as_str(),
            expires_in.as_str(),
            token.id_token.as_str(),
            token.name.as_str(),
            token.email.as_str(),
        ];

        let mut text = String::new();
        for (key, value) in STORE_KEYS.iter().zip(values) {
            if value.contains(['\n', '\r']) {
                return Err(AuthError::Invalid(format!(
                    "refusing to store `{key}` containing a line break"
                )));
            }
            text.push_str(key);
            text.push('=');
            text.push_str(value.trim());
            text.push('\n');
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_private_dir(parent)?;
        }
        write_private_atomic(&self.path, text.as_bytes())?;
        tracing::debug!(path = %self.path.display(), server, "stored token written");
        Ok(())
    }

    /// Delete the whole record. Returns `true` when a file was removed.
    pub fn remove(&self) -> Result<bool, AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(AuthError::Io(err)),
        }
    }

    fn read_fields(&self) -> Result<Option<BTreeMap<String, String>>, AuthError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(parse_fields(&text))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AuthError::Io(err)),
        }
    }
}

/// Parse `key=value` lines; blank, comment, and malformed lines are skipped.
fn parse_fields(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}
