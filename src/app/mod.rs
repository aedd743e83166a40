//! Binary-local command orchestration.
//!
//! `main.rs` only parses arguments and installs logging; command handlers and
//! the Julia launcher live here.

pub(crate) mod entry;
pub(crate) mod julia;
