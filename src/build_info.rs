//! Compile-time build metadata for `--version` and `--help`.

/// Semver package version from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// VCS commit hash captured at build time.
pub const GIT_COMMIT: &str = env!("JH_BUILD_GIT_HASH");

/// Build timestamp captured at compile time.
pub const BUILD_TIMESTAMP: &str = env!("JH_BUILD_TIMESTAMP");

/// `jh --version` body (clap prefixes the binary name).
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("JH_BUILD_GIT_HASH"),
    "\nbuilt: ",
    env!("JH_BUILD_TIMESTAMP")
);

/// Help trailer block that surfaces build metadata in `jh --help`.
pub const HELP_BUILD_METADATA: &str = concat!(
    "Build metadata:\n  commit: ",
    env!("JH_BUILD_GIT_HASH"),
    "\n  built: ",
    env!("JH_BUILD_TIMESTAMP")
);

/// One-line form used in the HTTP user agent and debug logs.
pub fn version_line() -> String {
    format!("jh {VERSION} ({GIT_COMMIT}, built {BUILD_TIMESTAMP})")
}
