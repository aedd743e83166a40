//! `git credential` helper protocol.
//!
//! git writes `key=value` lines on stdin, terminated by a blank line or EOF,
//! and reads `username=`/`password=` back from stdout. An empty reply makes
//! git fall through to the next configured helper.

use std::io::{self, BufRead, Write};

use crate::auth::server::strip_port;
use crate::auth::{
    is_known_host, normalize_server, DeviceFlow, DeviceFlowTiming, StoredToken, TokenLifecycle,
};
use crate::error::HelperError;
use crate::ui::RenderSink;

/// Username git sends alongside the ID token.
pub const HELPER_USERNAME: &str = "oauth2";

/// Fields of one credential request; unknown keys are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialRequest {
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
}

impl CredentialRequest {
    /// Read lines until a blank line or EOF.
    pub fn parse<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut request = Self::default();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                break;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = Some(value.to_string());
            match key {
                "protocol" => request.protocol = value,
                "host" => request.host = value,
                "path" => request.path = value,
                _ => {}
            }
        }
        Ok(request)
    }

    fn host(&self) -> &str {
        self.host.as_deref().map(str::trim).unwrap_or_default()
    }
}

/// Answers `get` requests for the active identity.
pub struct CredentialHelper<'a> {
    lifecycle: &'a TokenLifecycle,
    configured_server: &'a str,
    timing: DeviceFlowTiming,
    open_browser: bool,
}

impl<'a> CredentialHelper<'a> {
    pub fn new(lifecycle: &'a TokenLifecycle, configured_server: &'a str) -> Self {
        Self {
            lifecycle,
            configured_server,
            timing: DeviceFlowTiming::default(),
            open_browser: true,
        }
    }

    pub fn with_timing(mut self, timing: DeviceFlowTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    /// Handle `get`. Unrelated hosts produce no output and succeed.
    pub async fn get<W: Write>(
        &self,
        request: &CredentialRequest,
        sink: &dyn RenderSink,
        out: &mut W,
    ) -> Result<(), HelperError> {
        let host = request.host();
        if !is_known_host(host, Some(self.configured_server)) {
            tracing::debug!(host, "credential request for unrelated host");
            return Ok(());
        }

        let requested = normalize_server(strip_port(host));
        let token = match self.lifecycle.store().read() {
            Ok(stored) if normalize_server(&stored.server) == requested => {
                self.lifecycle.ensure_valid().await?
            }
            Ok(stored) => {
                tracing::info!(
                    stored = %stored.server,
                    requested = %requested,
                    "stored identity does not match requested host"
                );
                self.login(&requested, sink).await?
            }
            Err(err) => {
                tracing::info!(error = %err, "no usable stored token; starting login");
                self.login(&requested, sink).await?
            }
        };

        write!(
            out,
            "username={HELPER_USERNAME}\npassword={}\n",
            token.id_token
        )?;
        out.flush()?;
        Ok(())
    }

    async fn login(&self, server: &str, sink: &dyn RenderSink) -> Result<StoredToken, HelperError> {
        let mut flow = DeviceFlow::new(self.lifecycle.transport(), server)
            .with_timing(self.timing)
            .with_browser(self.open_browser);
        let response = flow.run(sink).await?;
        Ok(self.lifecycle.complete_login(server, &response)?)
    }
}

/// `store` and `erase`: drain the request and ignore it.
pub fn ignore_request<R: BufRead>(reader: R) -> io::Result<()> {
    CredentialRequest::parse(reader).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialProjector, TokenStore};
    use crate::testsupport::{fake_jwt, MockTransport, RecordingSink, TestTempDir};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn lifecycle(tmp: &TestTempDir, transport: &MockTransport) -> TokenLifecycle {
        TokenLifecycle::new(
            TokenStore::new(tmp.child(".juliahub")),
            Arc::new(transport.clone()),
            CredentialProjector::new(None, Some(tmp.path())),
        )
    }

    fn valid_token(server: &str, id_token: &str) -> StoredToken {
        StoredToken {
            server: server.into(),
            access_token: fake_jwt(&json!({ "exp": now() + 3600 })),
            refresh_token: "refresh".into(),
            token_type: "bearer".into(),
            expires_in: 3600,
            id_token: id_token.into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
        }
    }

    fn request(host: &str) -> CredentialRequest {
        CredentialRequest {
            protocol: Some("https".into()),
            host: Some(host.into()),
            path: None,
        }
    }

    fn fast_timing() -> DeviceFlowTiming {
        DeviceFlowTiming {
            warmup: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
        }
    }

    #[test]
    fn parse_reads_until_blank_line_and_tolerates_crlf() {
        let input = "protocol=https\r\nhost=juliahub.com\r\nwwwauth[]=Bearer\nnoise\n\nhost=ignored\n";
        let request = CredentialRequest::parse(input.as_bytes()).expect("parse");
        assert_eq!(request.protocol.as_deref(), Some("https"));
        assert_eq!(request.host.as_deref(), Some("juliahub.com"));
        assert_eq!(request.path, None);
    }

    #[test]
    fn parse_accepts_eof_without_terminator() {
        let request = CredentialRequest::parse("host=acme.juliahub.com".as_bytes()).unwrap();
        assert_eq!(request.host.as_deref(), Some("acme.juliahub.com"));
    }

    #[tokio::test]
    async fn unrelated_host_emits_nothing() {
        let tmp = TestTempDir::new("helper-unrelated");
        let transport = MockTransport::new();
        let lifecycle = lifecycle(&tmp, &transport);
        let helper = CredentialHelper::new(&lifecycle, "juliahub.com");
        let mut out = Vec::new();

        helper
            .get(&request("unrelated-host.example.com"), &RecordingSink::default(), &mut out)
            .await
            .expect("falls through");

        assert!(out.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn matching_unexpired_token_is_emitted_without_network() {
        let tmp = TestTempDir::new("helper-match");
        let transport = MockTransport::new();
        let lifecycle = lifecycle(&tmp, &transport);
        let id_token = fake_jwt(&json!({ "exp": now() + 3600, "name": "Ada" }));
        lifecycle
            .store()
            .write("juliahub.com", &valid_token("juliahub.com", &id_token))
            .unwrap();
        let helper = CredentialHelper::new(&lifecycle, "juliahub.com");
        let mut out = Vec::new();

        helper
            .get(&request("juliahub.com"), &RecordingSink::default(), &mut out)
            .await
            .expect("credentials");

        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("username=oauth2\npassword={id_token}\n")
        );
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn configured_custom_server_is_served() {
        let tmp = TestTempDir::new("helper-custom");
        let transport = MockTransport::new();
        let lifecycle = lifecycle(&tmp, &transport);
        lifecycle
            .store()
            .write("hub.example.org", &valid_token("hub.example.org", "id.custom.sig"))
            .unwrap();
        let helper = CredentialHelper::new(&lifecycle, "hub.example.org");
        let mut out = Vec::new();

        helper
            .get(&request("hub.example.org:443"), &RecordingSink::default(), &mut out)
            .await
            .unwrap();

        assert!(String::from_utf8(out).unwrap().ends_with("password=id.custom.sig\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn mismatched_identity_triggers_login_and_overwrites_store() {
        let tmp = TestTempDir::new("helper-mismatch");
        let transport = MockTransport::new();
        let lifecycle = lifecycle(&tmp, &transport);
        lifecycle
            .store()
            .write("juliahub.com", &valid_token("juliahub.com", "old.id.token"))
            .unwrap();
        let new_id = fake_jwt(&json!({ "exp": now() + 3600, "email": "ada@acme.example.com" }));
        transport.push_json(
            200,
            json!({
                "device_code": "dev-1",
                "user_code": "ABCD-EFGH",
                "verification_uri_complete": "https://acme.juliahub.com/dex/device?user_code=ABCD-EFGH",
                "expires_in": 300,
                "interval": 5
            }),
        );
        transport.push_json(
            200,
            json!({
                "access_token": fake_jwt(&json!({ "exp": now() + 3600 })),
                "refresh_token": "r",
                "id_token": new_id,
                "expires_in": 3600
            }),
        );
        let helper = CredentialHelper::new(&lifecycle, "juliahub.com")
            .with_timing(fast_timing())
            .with_browser(false);
        let sink = RecordingSink::default();
        let mut out = Vec::new();

        helper
            .get(&request("acme.juliahub.com"), &sink, &mut out)
            .await
            .expect("login completes");

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].url, "https://acme.juliahub.com/dex/device/code");
        assert!(sink.saw("user_code", "ABCD-EFGH"));
        let stored = lifecycle.store().read().unwrap();
        assert_eq!(stored.server, "acme.juliahub.com");
        assert_eq!(stored.email, "ada@acme.example.com");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("username=oauth2\npassword={new_id}\n")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_store_falls_into_login() {
        let tmp = TestTempDir::new("helper-corrupt");
        tmp.write_text(".juliahub", "server=juliahub.com\naccess_token=x\nexpires_in=soon\n");
        let transport = MockTransport::new();
        let lifecycle = lifecycle(&tmp, &transport);
        transport.push_text(500, "issuer down");
        let helper = CredentialHelper::new(&lifecycle, "juliahub.com").with_browser(false);
        let mut out = Vec::new();

        let err = helper
            .get(&request("juliahub.com"), &RecordingSink::default(), &mut out)
            .await
            .expect_err("login attempted and failed");

        assert!(matches!(
            err,
            HelperError::Auth(crate::auth::AuthError::DeviceCodeRequestFailed(500, _))
        ));
        assert_eq!(transport.calls()[0].url, "https://auth.juliahub.com/dex/device/code");
        assert!(out.is_empty());
    }

    #[test]
    fn store_and_erase_drain_input() {
        ignore_request("protocol=https\nhost=juliahub.com\npassword=x\n\n".as_bytes()).unwrap();
    }
}
