//! Rendering contract consumed by the auth flows and command handlers.
//!
//! `Renderer` is the default terminal implementation; tests substitute a
//! recording sink without coupling to stderr output.

pub use crate::ui::progress::ProgressHandle;
pub use crate::ui::renderer::Renderer;

/// Injectable rendering interface used by orchestration code.
pub trait RenderSink: Send + Sync {
    /// Start a progress indicator for a long-running wait.
    fn progress(&self, label: &str) -> ProgressHandle;
    /// Render a warning line.
    fn warn(&self, msg: &str);
    /// Render a titled section divider.
    fn section(&self, title: &str);
    /// Render activity/lifecycle text.
    fn activity(&self, text: &str);
    /// Render one key/value field row.
    fn field(&self, key: &str, value: &str);
    /// Render the device-flow user code.
    fn user_code(&self, code: &str);
    /// Render additional detail text.
    fn detail(&self, text: &str);
    /// Render an error line.
    fn error(&self, msg: &str);
}

impl RenderSink for Renderer {
    fn progress(&self, label: &str) -> ProgressHandle {
        self.progress(label)
    }

    fn warn(&self, msg: &str) {
        self.warn(msg);
    }

    fn section(&self, title: &str) {
        self.section(title);
    }

    fn activity(&self, text: &str) {
        self.activity(text);
    }

    fn field(&self, key: &str, value: &str) {
        self.field(key, value);
    }

    fn user_code(&self, code: &str) {
        self.user_code(code);
    }

    fn detail(&self, text: &str) {
        self.detail(text);
    }

    fn error(&self, msg: &str) {
        self.error(msg);
    }
}
