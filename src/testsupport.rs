//! Shared test fixtures for auth, projection, and credential-helper tests.
//!
//! Temp dirs, unsigned JWT builders, a scripted issuer transport, and a
//! recording render sink live here so each test module does not rebuild them.

use async_trait::async_trait;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::{AuthError, AuthTransport, HttpReply};
use crate::ui::{ProgressHandle, RenderSink};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!(
            "jh-{prefix}-{}-{millis}-{suffix}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    /// Root directory path for this fixture.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build a child path under the fixture root.
    pub fn child(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Write UTF-8 text to a child path, creating parent directories as needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.child(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories for fixture");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Unsigned three-segment JWT with `claims` as payload (unpadded base64url).
pub fn fake_jwt(claims: &Value) -> String {
    jwt_with_engine(claims, &URL_SAFE_NO_PAD)
}

/// Same as `fake_jwt`, but the payload keeps its `=` padding.
pub fn fake_jwt_padded(claims: &Value) -> String {
    jwt_with_engine(claims, &URL_SAFE)
}

fn jwt_with_engine(claims: &Value, engine: &impl Engine) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "none", "typ": "JWT" }).to_string());
    let payload = engine.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

/// One form POST captured by `MockTransport`.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub form: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Scripted issuer: replies are served in push order, requests are recorded.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<HttpReply>>>,
    calls: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_text(status, &body.to_string());
    }

    pub fn push_text(&self, status: u16, body: &str) {
        self.replies.lock().expect("replies lock").push_back(HttpReply {
            status,
            body: body.to_string(),
        });
    }

    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }
}

#[async_trait]
impl AuthTransport for MockTransport {
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpReply, AuthError> {
        self.calls.lock().expect("calls lock").push(RecordedRequest {
            url: url.to_string(),
            form: form
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        });
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .ok_or_else(|| AuthError::Invalid(format!("no scripted reply for {url}")))
    }
}

/// Render sink that records `(kind, message)` pairs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn push(&self, kind: &str, message: String) {
        self.entries
            .lock()
            .expect("entries lock")
            .push((kind.to_string(), message));
    }

    /// Whether any entry of `kind` contains `needle`.
    pub fn saw(&self, kind: &str, needle: &str) -> bool {
        self.entries
            .lock()
            .expect("entries lock")
            .iter()
            .any(|(k, msg)| k == kind && msg.contains(needle))
    }
}

impl RenderSink for RecordingSink {
    fn progress(&self, label: &str) -> ProgressHandle {
        self.push("progress", label.to_string());
        ProgressHandle::disabled()
    }

    fn warn(&self, msg: &str) {
        self.push("warn", msg.to_string());
    }

    fn section(&self, title: &str) {
        self.push("section", title.to_string());
    }

    fn activity(&self, text: &str) {
        self.push("activity", text.to_string());
    }

    fn field(&self, key: &str, value: &str) {
        self.push("field", format!("{key}: {value}"));
    }

    fn user_code(&self, code: &str) {
        self.push("user_code", code.to_string());
    }

    fn detail(&self, text: &str) {
        self.push("detail", text.to_string());
    }

    fn error(&self, msg: &str) {
        self.push("error", msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt;

    #[test]
    fn temp_dir_fixture_writes_and_resolves_paths() {
        let fixture = TestTempDir::new("fixture");
        let file = fixture.write_text("nested/file.txt", "hello");
        assert_eq!(fs::read_to_string(file).unwrap(), "hello");
    }

    #[test]
    fn fake_jwt_decodes_with_production_decoder() {
        let token = fake_jwt(&json!({ "exp": 42, "name": "Ada" }));
        let claims = jwt::decode(&token).expect("decodes");
        assert_eq!(claims.exp, 42);
        assert_eq!(claims.name(), Some("Ada"));
    }

    #[tokio::test]
    async fn mock_transport_replays_in_order_and_records() {
        let transport = MockTransport::new();
        transport.push_text(200, "first");
        let reply = transport
            .post_form("https://x.test/token", &[("a", "1")])
            .await
            .expect("scripted");
        assert_eq!(reply.body, "first");
        assert!(transport.post_form("https://x.test/token", &[]).await.is_err());
        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.calls()[0].param("a"), Some("1"));
    }

    #[test]
    fn recording_sink_matches_kind_and_substring() {
        let sink = RecordingSink::default();
        sink.field("server", "juliahub.com");
        assert!(sink.saw("field", "juliahub.com"));
        assert!(!sink.saw("warn", "juliahub.com"));
    }
}
