//! JuliaHub credential lifecycle.
//!
//! Device-code login, JWT inspection, token refresh, the `~/.juliahub`
//! store, and projection of the active credential into Julia depot
//! `auth.toml` files.

mod atomic;
pub mod device;
mod error;
pub mod jwt;
mod lifecycle;
mod projector;
pub mod server;
mod store;
mod transport;
mod types;

pub use device::{DeviceFlow, DeviceFlowSession, DeviceFlowState, DeviceFlowTiming};
pub use error::AuthError;
pub use lifecycle::TokenLifecycle;
pub use projector::CredentialProjector;
pub use server::{is_known_host, normalize_server};
pub use store::TokenStore;
pub use transport::{AuthTransport, HttpReply, ReqwestTransport};
pub use types::{StoredToken, TokenResponse, TokenStatus};
