//! Launching Julia against the active JuliaHub package server.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

const JULIA_BINARY: &str = "julia";

/// Environment additions that point Pkg at `server` and make it use git's
/// credential helpers.
pub(crate) fn julia_env(server: &str) -> [(&'static str, String); 2] {
    [
        ("JULIA_PKG_SERVER", format!("https://{server}")),
        ("JULIA_PKG_USE_CLI_GIT", "true".to_string()),
    ]
}

/// Locate `julia` on a `PATH`-style search list.
pub(crate) fn find_julia(path_var: Option<&OsStr>) -> Option<PathBuf> {
    let path_var = path_var?;
    std::env::split_paths(path_var)
        .flat_map(|dir| candidate_names().map(move |name| dir.join(name)))
        .find(|candidate| is_executable(candidate))
}

fn candidate_names() -> impl Iterator<Item = String> {
    let exts: Vec<&str> = if cfg!(windows) {
        vec![".exe", ".cmd", ".bat"]
    } else {
        vec![""]
    };
    exts.into_iter().map(|ext| format!("{JULIA_BINARY}{ext}"))
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Run `julia --project=. ARGS...` with inherited stdio and return its exit code.
pub(crate) async fn run_julia(julia: &Path, server: &str, args: &[String]) -> Result<i32, String> {
    tracing::info!(julia = %julia.display(), server, "launching julia");
    let status = tokio::process::Command::new(julia)
        .arg("--project=.")
        .args(args)
        .envs(julia_env(server))
        .status()
        .await
        .map_err(|err| format!("failed to start julia: {err}"))?;
    // Killed by a signal: no code, report generic failure.
    Ok(status.code().unwrap_or(1))
}
