//! git integration: the credential-helper protocol and its registration.

mod helper;
mod setup;

pub use helper::{ignore_request, CredentialHelper, CredentialRequest, HELPER_USERNAME};
pub use setup::{helper_urls, helper_value, setup, GitCommand, GitConfigWriter};
