//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};

/// JuliaHub command line: login, token refresh, and credentials for git and
/// the Julia package manager.
#[derive(Debug, Parser)]
#[command(
    name = "jh",
    version,
    long_version = jh::build_info::LONG_VERSION,
    after_help = jh::build_info::HELP_BUILD_METADATA
)]
pub struct Args {
    /// Disable color output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the saved JuliaHub login.
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Configure and launch Julia against the active server.
    #[command(subcommand)]
    Julia(JuliaCommand),
    /// git credential helper (invoked by git).
    #[command(name = "git-credential", hide = true)]
    GitCredential {
        #[command(subcommand)]
        verb: GitCredentialVerb,
    },
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Log in with the device flow and save the token.
    Login {
        /// Server to log in to, e.g. `juliahub.com` or a tenant name.
        #[arg(short = 's', long = "server")]
        server: Option<String>,
    },
    /// Refresh the saved token now, even if it has not expired.
    Refresh,
    /// Show the saved login without contacting the server.
    Status,
    /// Delete the saved login.
    Logout,
}

#[derive(Debug, Subcommand)]
pub enum JuliaCommand {
    /// Write `auth.toml` for the active server into the Julia depot.
    Credentials,
    /// Run `julia --project=.` with JuliaHub package-server settings.
    Run {
        /// Arguments passed through to julia.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum GitCredentialVerb {
    Get,
    Store,
    Erase,
    /// Register this executable as git's helper for JuliaHub hosts.
    Setup,
}
