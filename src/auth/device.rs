//! OAuth2 device-authorization flow against the server's Dex issuer.
//!
//! `Init -> Requested -> Polling -> {Authorized, Denied, Error}`. The engine
//! only talks to the network and the render sink; persisting the result is
//! the caller's job so login and credential-helper re-auth share it.

use std::time::Duration;
use tokio::time::{sleep, Instant};

use super::error::AuthError;
use super::server::{device_code_url, token_url};
use super::transport::AuthTransport;
use super::types::{DeviceCodeResponse, TokenResponse};
use crate::ui::{try_open_browser, RenderSink};

/// Public client id registered with the issuer for CLI logins.
pub(crate) const CLIENT_ID: &str = "device";
const DEVICE_SCOPE: &str = "openid email profile offline_access";
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const PENDING_ERROR: &str = "authorization_pending";
const DENIED_ERROR: &str = "access_denied";

/// Fixed delays around polling. The issuer rejects immediate polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFlowTiming {
    /// Delay between showing the code and the first poll.
    pub warmup: Duration,
    /// Delay before every poll request.
    pub poll_interval: Duration,
}

impl Default for DeviceFlowTiming {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(15),
            poll_interval: Duration::from_secs(4),
        }
    }
}

/// Observable engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFlowState {
    Init,
    Requested,
    Polling { attempts: u32 },
    Authorized,
    Denied(String),
    Error(String),
}

/// One login attempt's device code. Lives in memory only.
#[derive(Debug, Clone)]
pub struct DeviceFlowSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri_complete: String,
    /// Issuer polling hint; informational, the engine polls on a fixed delay.
    pub interval_secs: Option<i64>,
    pub expires_in: Option<i64>,
    issued_at: Instant,
}

impl DeviceFlowSession {
    /// Local polling deadline derived from the device code's `expires_in`.
    fn deadline(&self) -> Option<Instant> {
        self.expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| self.issued_at + Duration::from_secs(secs as u64))
    }
}

/// Device-flow driver for one server.
pub struct DeviceFlow<'a> {
    transport: &'a dyn AuthTransport,
    server: String,
    timing: DeviceFlowTiming,
    open_browser: bool,
    state: DeviceFlowState,
}

impl<'a> DeviceFlow<'a> {
    pub fn new(transport: &'a dyn AuthTransport, server: &str) -> Self {
        Self {
            transport,
            server: server.to_string(),
            timing: DeviceFlowTiming::default(),
            open_browser: false,
            state: DeviceFlowState::Init,
        }
    }

    pub fn with_timing(mut self, timing: DeviceFlowTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Try to open the verification page in a browser when presenting it.
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    pub fn state(&self) -> &DeviceFlowState {
        &self.state
    }

    /// Run the whole flow: request a code, show it, poll until resolved.
    pub async fn run(&mut self, sink: &dyn RenderSink) -> Result<TokenResponse, AuthError> {
        let session = self.request_code().await?;
        self.present(&session, sink);
        let response = {
            let _progress = sink.progress("waiting for authorization");
            self.poll_until_complete(&session).await?
        };
        if response.refresh_token().is_none() {
            tracing::warn!(server = %self.server, "device login returned no refresh token");
            sink.warn("issuer returned no refresh token; this login cannot be refreshed automatically");
        }
        Ok(response)
    }

    /// `Init -> Requested`: ask the issuer for a device and user code.
    pub async fn request_code(&mut self) -> Result<DeviceFlowSession, AuthError> {
        let form = [
            ("client_id", CLIENT_ID),
            ("scope", DEVICE_SCOPE),
            ("grant_type", DEVICE_GRANT_TYPE),
        ];
        let url = device_code_url(&self.server);
        let result = self.transport.post_form(&url, &form).await;
        let reply = result.map_err(|err| self.fail(err))?;
        if !reply.is_success() {
            let err = AuthError::DeviceCodeRequestFailed(reply.status, reply.body);
            return Err(self.fail(err));
        }

        let payload: DeviceCodeResponse = serde_json::from_str(&reply.body).map_err(|err| {
            self.fail(AuthError::Invalid(format!(
                "failed to parse device code response: {err}"
            )))
        })?;
        let Some(verification_uri_complete) = payload
            .verification_uri_complete
            .or(payload.verification_uri)
            .filter(|uri| !uri.trim().is_empty())
        else {
            return Err(self.fail(AuthError::Invalid(
                "device code response did not include a verification URL".to_string(),
            )));
        };

        self.transition(DeviceFlowState::Requested);
        Ok(DeviceFlowSession {
            device_code: payload.device_code,
            user_code: payload.user_code,
            verification_uri_complete,
            interval_secs: payload.interval,
            expires_in: payload.expires_in,
            issued_at: Instant::now(),
        })
    }

    /// Show the verification URL and user code.
    pub fn present(&self, session: &DeviceFlowSession, sink: &dyn RenderSink) {
        sink.section("login");
        sink.field("server", &self.server);
        sink.field("url", &session.verification_uri_complete);
        sink.user_code(&session.user_code);
        if self.open_browser {
            if try_open_browser(&session.verification_uri_complete) {
                sink.field("browser", "opened");
            } else {
                sink.field("browser", "not available (open URL manually)");
            }
        }
    }

    /// `Requested -> Polling -> terminal`: wait out the warm-up, then poll
    /// on the fixed interval until the issuer resolves the code.
    pub async fn poll_until_complete(
        &mut self,
        session: &DeviceFlowSession,
    ) -> Result<TokenResponse, AuthError> {
        tracing::debug!(
            interval_hint = ?session.interval_secs,
            expires_in = ?session.expires_in,
            "device code issued"
        );
        sleep(self.timing.warmup).await;

        let url = token_url(&self.server);
        let form = [
            ("client_id", CLIENT_ID),
            ("grant_type", DEVICE_GRANT_TYPE),
            ("device_code", session.device_code.as_str()),
        ];
        let mut attempts = 0u32;
        loop {
            sleep(self.timing.poll_interval).await;
            if session.deadline().is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(self.fail_authorization("expired_token".to_string(), false));
            }
            attempts += 1;
            self.transition(DeviceFlowState::Polling { attempts });

            let result = self.transport.post_form(&url, &form).await;
            let reply = result.map_err(|err| self.fail(err))?;
            let Ok(response) = serde_json::from_str::<TokenResponse>(&reply.body) else {
                return Err(self.fail_authorization(
                    format!("unexpected token response (status {})", reply.status),
                    false,
                ));
            };

            match response.error.as_deref().map(str::trim) {
                Some(PENDING_ERROR) => continue,
                Some(code) if !code.is_empty() => {
                    let denied = code == DENIED_ERROR;
                    let message = response
                        .error_message()
                        .unwrap_or_else(|| code.to_string());
                    return Err(self.fail_authorization(message, denied));
                }
                _ => {}
            }

            if response.access_token().is_some() {
                self.transition(DeviceFlowState::Authorized);
                return Ok(response);
            }
            return Err(self.fail_authorization(
                format!(
                    "token response carried neither a token nor an error (status {})",
                    reply.status
                ),
                false,
            ));
        }
    }

    fn transition(&mut self, next: DeviceFlowState) {
        tracing::debug!(from = ?self.state, to = ?next, "device flow transition");
        self.state = next;
    }

    fn fail(&mut self, err: AuthError) -> AuthError {
        self.transition(DeviceFlowState::Error(err.to_string()));
        err
    }

    fn fail_authorization(&mut self, reason: String, denied: bool) -> AuthError {
        if denied {
            self.transition(DeviceFlowState::Denied(reason.clone()));
        } else {
            self.transition(DeviceFlowState::Error(reason.clone()));
        }
        AuthError::AuthorizationFailed(reason)
    }
}
