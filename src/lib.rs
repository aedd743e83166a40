//! jh: JuliaHub credential lifecycle for the terminal.
//!
//! Logs in with the OAuth2 device flow, keeps the saved token fresh, and
//! hands it to git (credential helper) and the Julia package manager
//! (`auth.toml` projection).
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use jh::auth::{ReqwestTransport, TokenLifecycle};
//! use jh::config::load_config;
//!
//! # async fn example() {
//! let config = load_config(None).unwrap();
//! let lifecycle = TokenLifecycle::new(
//!     config.store(),
//!     Arc::new(ReqwestTransport::new(config.http_timeout).unwrap()),
//!     config.projector(),
//! );
//! let token = lifecycle.ensure_valid().await.unwrap();
//! println!("{}", token.server);
//! # }
//! ```

pub mod auth;
pub mod build_info;
pub mod config;
pub mod error;
pub mod git;
#[cfg(test)]
pub mod testsupport;
pub mod ui;
