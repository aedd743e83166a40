//! Unverified JWT claim decoding.
//!
//! Signatures are never checked. The claims are advisory: they drive expiry
//! decisions and display fields, while trust comes from talking to the
//! configured issuer over TLS.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;

use super::error::AuthError;
use super::types::unix_now_secs;

/// Identity and timing claims carried by ID and access tokens.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub exp: i64,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

impl Claims {
    /// Absolute expiry in unix seconds: `exp`, else `iat + expires_in`.
    pub fn expires_at(&self, expires_in: i64) -> Option<i64> {
        if self.exp > 0 {
            return Some(self.exp);
        }
        if self.iat > 0 && expires_in > 0 {
            return Some(self.iat.saturating_add(expires_in));
        }
        None
    }

    pub fn name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    pub fn email(&self) -> Option<&str> {
        non_blank(self.email.as_deref())
    }

    pub fn preferred_username(&self) -> Option<&str> {
        non_blank(self.preferred_username.as_deref())
    }
}

/// Decode the payload segment of a three-part token into claims.
pub fn decode(token: &str) -> Result<Claims, AuthError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::MalformedToken(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }
    // Issuers disagree on padding; strip it and decode the canonical form.
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|err| AuthError::MalformedToken(format!("invalid base64url payload: {err}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| AuthError::MalformedToken(format!("invalid claims json: {err}")))
}

/// True when `access_token` is expired at the current time.
pub fn is_expired(access_token: &str, expires_in: i64) -> bool {
    is_expired_at(access_token, expires_in, unix_now_secs())
}

/// Expiry check against an explicit clock. Undecodable tokens and tokens
/// without any usable timing claims count as expired.
pub fn is_expired_at(access_token: &str, expires_in: i64, now: i64) -> bool {
    let Ok(claims) = decode(access_token) else {
        return true;
    };
    match claims.expires_at(expires_in) {
        Some(expires_at) => expires_at <= now,
        None => true,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
