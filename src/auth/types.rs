//! Public auth model types.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// The single credential record kept in the primary store.
///
/// `expires_in` is the lifetime reported at issuance, not an absolute time;
/// expiry is always recomputed from the access token's claims.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredToken {
    pub server: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub id_token: String,
    pub name: String,
    pub email: String,
}

impl StoredToken {
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }
}

/// Token endpoint response for both device-code polling and refresh grants.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(deserialize_with = "deserialize_i64_option", default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// Access token, when the response carries a non-empty one.
    pub fn access_token(&self) -> Option<&str> {
        non_empty(self.access_token.as_deref())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        non_empty(self.refresh_token.as_deref())
    }

    pub fn id_token(&self) -> Option<&str> {
        non_empty(self.id_token.as_deref())
    }

    /// Error code plus optional description, formatted for display.
    pub(crate) fn error_message(&self) -> Option<String> {
        let code = non_empty(self.error.as_deref())?;
        match non_empty(self.error_description.as_deref()) {
            Some(description) => Some(format!("{code}: {description}")),
            None => Some(code.to_string()),
        }
    }
}

/// Device-code endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeviceCodeResponse {
    pub(crate) device_code: String,
    pub(crate) user_code: String,
    #[serde(default)]
    pub(crate) verification_uri_complete: Option<String>,
    #[serde(default)]
    pub(crate) verification_uri: Option<String>,
    #[serde(deserialize_with = "deserialize_i64_option", default)]
    pub(crate) expires_in: Option<i64>,
    #[serde(deserialize_with = "deserialize_i64_option", default)]
    pub(crate) interval: Option<i64>,
}

/// Read-only summary of the stored credential for `jh auth status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStatus {
    pub server: String,
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub expires_at_unix: Option<i64>,
    pub expired: bool,
    pub has_refresh_token: bool,
}

pub(crate) fn unix_now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Deserialize optional integer durations encoded as string/number/null.
fn deserialize_i64_option<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(num) => num
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom("duration must be an integer"))
            .map(Some),
        serde_json::Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|err| serde::de::Error::custom(format!("invalid duration: {err}"))),
        _ => Err(serde::de::Error::custom(
            "duration must be string, number, or null",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_accepts_string_encoded_expiry() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":"3600"}"#).unwrap();
        assert_eq!(parsed.expires_in, Some(3600));
        assert_eq!(parsed.access_token(), Some("a"));
    }

    #[test]
    fn blank_tokens_read_as_absent() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","refresh_token":"  "}"#).unwrap();
        assert_eq!(parsed.refresh_token(), None);
        assert_eq!(parsed.id_token(), None);
    }

    #[test]
    fn error_message_includes_description_when_present() {
        let parsed: TokenResponse = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"token revoked"}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.error_message().as_deref(),
            Some("invalid_grant: token revoked")
        );
        let bare: TokenResponse = serde_json::from_str(r#"{"error":"access_denied"}"#).unwrap();
        assert_eq!(bare.error_message().as_deref(), Some("access_denied"));
    }

    #[test]
    fn device_code_response_tolerates_missing_optionals() {
        let parsed: DeviceCodeResponse =
            serde_json::from_str(r#"{"device_code":"d","user_code":"ABCD-EFGH"}"#).unwrap();
        assert_eq!(parsed.user_code, "ABCD-EFGH");
        assert!(parsed.expires_in.is_none());
        assert!(parsed.verification_uri_complete.is_none());
    }
}
