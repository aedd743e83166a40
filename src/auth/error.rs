//! Auth subsystem error definitions.

use std::fmt;

/// Errors surfaced by the credential lifecycle subsystem.
#[derive(Debug)]
pub enum AuthError {
    /// A bearer token did not parse as a three-segment JWT with a JSON payload.
    MalformedToken(String),
    /// The primary store is absent or lacks an access token.
    NoStoredToken,
    /// No usable credential exists for the active server.
    NotAuthenticated,
    /// The device-code request returned a non-2xx status.
    DeviceCodeRequestFailed(u16, String),
    /// The issuer denied or aborted device authorization.
    AuthorizationFailed(String),
    /// The stored token expired and carries no refresh token.
    RefreshUnavailable,
    /// The refresh-token exchange failed.
    RefreshFailed(String),
    /// Writing an external credential file failed.
    ProjectionFailed(String),
    Io(std::io::Error),
    Http(reqwest::Error),
    Invalid(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedToken(msg) => write!(f, "malformed token: {msg}"),
            Self::NoStoredToken => write!(f, "no stored token"),
            Self::NotAuthenticated => {
                write!(f, "not authenticated; run `jh auth login` first")
            }
            Self::DeviceCodeRequestFailed(code, body) => {
                write!(f, "device code request failed (status {code}): {body}")
            }
            Self::AuthorizationFailed(reason) => write!(f, "authorization failed: {reason}"),
            Self::RefreshUnavailable => write!(
                f,
                "saved login has expired and cannot be refreshed; run `jh auth login` again"
            ),
            Self::RefreshFailed(msg) => write!(
                f,
                "token refresh failed: {msg}; run `jh auth login` again"
            ),
            Self::ProjectionFailed(msg) => write!(f, "failed to write credential file: {msg}"),
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Http(err) => write!(f, "http: {err}"),
            Self::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<std::io::Error> for AuthError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}
