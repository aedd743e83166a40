//! HTTP seam for issuer requests.

use async_trait::async_trait;
use std::time::Duration;

use super::error::AuthError;

/// Raw issuer reply. Non-2xx statuses are data, not errors: the device
/// poller reads `error` codes out of 400 bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Form-encoded POST transport used by the device flow and refresh exchange.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpReply, AuthError>;
}

/// `reqwest`-backed transport with a client-level timeout.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jh/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AuthTransport for ReqwestTransport {
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpReply, AuthError> {
        tracing::debug!(url, "issuer request");
        let response = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(url, status, "issuer response");
        Ok(HttpReply { status, body })
    }
}
