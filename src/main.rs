//! CLI entry point for jh.

mod app;
mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `JH_LOG=jh=debug`.
const LOG_ENV: &str = "JH_LOG";

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    // stdout belongs to command output (and git's helper protocol), so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!args.no_color)
        .compact()
        .init();
    tracing::debug!(version = %jh::build_info::version_line(), "starting");

    let code = app::entry::run(args).await;
    std::process::exit(code);
}
