//! Registers `jh` as git's credential helper for JuliaHub hosts.

use std::path::Path;
use std::process::Command;

use crate::auth::server::PRIMARY_DOMAIN;
use crate::error::HelperError;

/// Writes one `credential.<url>.helper` entry to git's global config.
pub trait GitConfigWriter {
    fn set_helper(&self, url: &str, helper: &str) -> Result<(), HelperError>;
}

/// Production writer that shells out to `git config --global`.
pub struct GitCommand;

impl GitConfigWriter for GitCommand {
    fn set_helper(&self, url: &str, helper: &str) -> Result<(), HelperError> {
        let key = format!("credential.{url}.helper");
        let output = Command::new("git")
            .args(["config", "--global", "--replace-all", &key, helper])
            .output()
            .map_err(|err| HelperError::GitConfig(format!("failed to run git: {err}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HelperError::GitConfig(format!(
                "`git config {key}` exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        tracing::debug!(key, "registered credential helper");
        Ok(())
    }
}

/// Helper value for `exe`, quoted so paths with spaces survive git's shell.
pub fn helper_value(exe: &Path) -> String {
    let quoted = exe.display().to_string().replace('\'', r"'\''");
    format!("!'{quoted}' git-credential")
}

/// URL scopes to register: the primary domain, its subdomains, and a
/// configured server outside them.
pub fn helper_urls(configured_server: &str) -> Vec<String> {
    let mut urls = vec![
        format!("https://{PRIMARY_DOMAIN}"),
        format!("https://*.{PRIMARY_DOMAIN}"),
    ];
    let server = configured_server.trim();
    let covered = server.is_empty()
        || server == PRIMARY_DOMAIN
        || server.ends_with(&format!(".{PRIMARY_DOMAIN}"));
    if !covered {
        urls.push(format!("https://{server}"));
    }
    urls
}

/// Register `exe` for every helper URL. Returns the URLs written.
pub fn setup(
    writer: &dyn GitConfigWriter,
    exe: &Path,
    configured_server: &str,
) -> Result<Vec<String>, HelperError> {
    let helper = helper_value(exe);
    let urls = helper_urls(configured_server);
    for url in &urls {
        writer.set_helper(url, &helper)?;
    }
    Ok(urls)
}
