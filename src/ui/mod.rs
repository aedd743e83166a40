//! Terminal-facing output.
//!
//! Orchestration code depends on the `RenderSink` contract; `Renderer` is the
//! crossterm-styled stderr implementation.

pub mod browser;
mod progress;
pub mod render;
mod renderer;
mod settings;

pub use browser::try_open_browser;
pub use render::{ProgressHandle, RenderSink, Renderer};
