//! Crate-level error types outside the auth subsystem.

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when resolving runtime configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// HelperError
// ---------------------------------------------------------------------------

/// Errors from the git credential-helper surface.
#[derive(Debug)]
pub enum HelperError {
    /// Reading the request or writing the reply failed.
    Io(std::io::Error),
    /// Login or refresh failed while answering `get`.
    Auth(crate::auth::AuthError),
    /// `git config` could not be run or rejected the change.
    GitConfig(String),
}

impl fmt::Display for HelperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Auth(e) => write!(f, "{e}"),
            Self::GitConfig(msg) => write!(f, "git config failed: {msg}"),
        }
    }
}

impl std::error::Error for HelperError {}

impl From<std::io::Error> for HelperError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<crate::auth::AuthError> for HelperError {
    fn from(e: crate::auth::AuthError) -> Self {
        Self::Auth(e)
    }
}
