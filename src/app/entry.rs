//! Command dispatch for the jh CLI.

use std::io::{self, Write};
use std::sync::Arc;

use crate::app::julia::{find_julia, run_julia};
use crate::cli::{self, AuthCommand, Command, GitCredentialVerb, JuliaCommand};
use jh::auth::{DeviceFlow, ReqwestTransport, StoredToken, TokenLifecycle};
use jh::config::{load_config, AuthConfig};
use jh::git::{self, CredentialHelper, CredentialRequest, GitCommand};
use jh::ui::{RenderSink, Renderer};

/// Top-level CLI entrypoint. Returns the process exit code.
pub(crate) async fn run(args: cli::Args) -> i32 {
    let renderer = Renderer::new(!args.no_color);
    let server_flag = match &args.command {
        Command::Auth(AuthCommand::Login { server }) => server.as_deref(),
        _ => None,
    };
    let config = match load_config(server_flag) {
        Ok(config) => config,
        Err(err) => {
            renderer.error(&err.to_string());
            return 1;
        }
    };
    let transport = match ReqwestTransport::new(config.http_timeout) {
        Ok(transport) => transport,
        Err(err) => {
            renderer.error(&format!("failed to build HTTP client: {err}"));
            return 1;
        }
    };
    let lifecycle = TokenLifecycle::new(config.store(), Arc::new(transport), config.projector());

    let result = match args.command {
        Command::Auth(command) => run_auth_command(&renderer, &config, &lifecycle, command).await,
        Command::Julia(JuliaCommand::Credentials) => {
            run_julia_credentials(&renderer, &config, &lifecycle).await
        }
        Command::Julia(JuliaCommand::Run { args }) => {
            return match run_julia_command(&config, &lifecycle, &args).await {
                Ok(code) => code,
                Err(msg) => {
                    renderer.error(&msg);
                    1
                }
            };
        }
        Command::GitCredential { verb } => {
            run_git_credential(&renderer, &config, &lifecycle, verb).await
        }
    };

    match result {
        Ok(()) => 0,
        Err(msg) => {
            renderer.error(&msg);
            1
        }
    }
}

async fn run_auth_command(
    renderer: &dyn RenderSink,
    config: &AuthConfig,
    lifecycle: &TokenLifecycle,
    command: AuthCommand,
) -> Result<(), String> {
    match command {
        AuthCommand::Login { .. } => run_login_flow(renderer, config, lifecycle).await,
        AuthCommand::Refresh => run_refresh(renderer, lifecycle).await,
        AuthCommand::Status => run_status(renderer, lifecycle),
        AuthCommand::Logout => run_logout(renderer, lifecycle),
    }
}

/// Device-flow login for `config.server`; replaces any saved identity.
pub(crate) async fn run_login_flow(
    renderer: &dyn RenderSink,
    config: &AuthConfig,
    lifecycle: &TokenLifecycle,
) -> Result<(), String> {
    let mut flow =
        DeviceFlow::new(lifecycle.transport(), &config.server).with_browser(config.open_browser);
    let response = flow
        .run(renderer)
        .await
        .map_err(|err| format!("login failed: {err}"))?;
    let token = lifecycle
        .complete_login(&config.server, &response)
        .map_err(|err| format!("failed to save login credentials: {err}"))?;

    renderer.section("login successful");
    render_identity(renderer, &token);
    Ok(())
}

pub(crate) async fn run_refresh(
    renderer: &dyn RenderSink,
    lifecycle: &TokenLifecycle,
) -> Result<(), String> {
    renderer.activity("refreshing saved token");
    let token = lifecycle.refresh(true).await.map_err(|err| err.to_string())?;
    renderer.section("token refreshed");
    render_identity(renderer, &token);
    Ok(())
}

pub(crate) fn run_status(renderer: &dyn RenderSink, lifecycle: &TokenLifecycle) -> Result<(), String> {
    let status = lifecycle.status().map_err(|err| err.to_string())?;
    renderer.section("auth status");
    renderer.field("server", &status.server);
    if !status.name.is_empty() {
        renderer.field("name", &status.name);
    }
    if !status.email.is_empty() {
        renderer.field("email", &status.email);
    }
    if let Some(username) = &status.username {
        renderer.field("username", username);
    }
    if let Some(expires_at) = status.expires_at_unix {
        renderer.field("expires_at_unix", &expires_at.to_string());
    }
    renderer.field("expired", if status.expired { "yes" } else { "no" });
    renderer.field(
        "refreshable",
        if status.has_refresh_token { "yes" } else { "no" },
    );
    if status.expired && !status.has_refresh_token {
        renderer.warn("saved login has expired; run `jh auth login` again");
    }
    Ok(())
}

pub(crate) fn run_logout(renderer: &dyn RenderSink, lifecycle: &TokenLifecycle) -> Result<(), String> {
    let removed = lifecycle
        .store()
        .remove()
        .map_err(|err| format!("failed to remove saved login: {err}"))?;
    renderer.section("logout");
    renderer.field(
        "status",
        if removed {
            "removed saved credentials"
        } else {
            "no saved credentials found"
        },
    );
    Ok(())
}

/// Valid token for the configured server. A saved login for another server
/// is an error rather than a silent cross-server credential.
async fn active_token(
    config: &AuthConfig,
    lifecycle: &TokenLifecycle,
) -> Result<StoredToken, String> {
    let token = lifecycle.ensure_valid().await.map_err(|err| err.to_string())?;
    if token.server != config.server {
        return Err(format!(
            "saved login is for `{}`, not `{}`; run `jh auth login --server {}`",
            token.server, config.server, config.server
        ));
    }
    Ok(token)
}

pub(crate) async fn run_julia_credentials(
    renderer: &dyn RenderSink,
    config: &AuthConfig,
    lifecycle: &TokenLifecycle,
) -> Result<(), String> {
    let token = active_token(config, lifecycle).await?;
    let path = lifecycle
        .projector()
        .setup(&token.server, &token)
        .map_err(|err| err.to_string())?;
    renderer.section("julia credentials");
    renderer.field("server", &token.server);
    renderer.field("path", &path.display().to_string());
    renderer.detail("Julia's package manager reads this file for package server authentication");
    Ok(())
}

async fn run_julia_command(
    config: &AuthConfig,
    lifecycle: &TokenLifecycle,
    args: &[String],
) -> Result<i32, String> {
    let token = active_token(config, lifecycle).await?;
    lifecycle
        .projector()
        .setup(&token.server, &token)
        .map_err(|err| err.to_string())?;
    let Some(julia) = find_julia(std::env::var_os("PATH").as_deref()) else {
        return Err("julia not found in PATH; install Julia first".to_string());
    };
    run_julia(&julia, &token.server, args).await
}

async fn run_git_credential(
    renderer: &dyn RenderSink,
    config: &AuthConfig,
    lifecycle: &TokenLifecycle,
    verb: GitCredentialVerb,
) -> Result<(), String> {
    match verb {
        GitCredentialVerb::Get => {
            let request = CredentialRequest::parse(io::stdin().lock())
                .map_err(|err| format!("failed to read credential request: {err}"))?;
            let mut reply = Vec::new();
            CredentialHelper::new(lifecycle, &config.server)
                .with_browser(config.open_browser)
                .get(&request, renderer, &mut reply)
                .await
                .map_err(|err| err.to_string())?;
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&reply)
                .and_then(|()| stdout.flush())
                .map_err(|err| format!("failed to write credentials: {err}"))
        }
        GitCredentialVerb::Store | GitCredentialVerb::Erase => {
            git::ignore_request(io::stdin().lock())
                .map_err(|err| format!("failed to read credential request: {err}"))
        }
        GitCredentialVerb::Setup => {
            let exe = std::env::current_exe()
                .map_err(|err| format!("failed to resolve jh executable path: {err}"))?;
            let urls = git::setup(&GitCommand, &exe, &config.server).map_err(|err| err.to_string())?;
            renderer.section("git credential helper");
            renderer.field("helper", &git::helper_value(&exe));
            for url in &urls {
                renderer.field("url", url);
            }
            Ok(())
        }
    }
}

fn render_identity(renderer: &dyn RenderSink, token: &StoredToken) {
    renderer.field("server", &token.server);
    if !token.name.is_empty() {
        renderer.field("name", &token.name);
    }
    if !token.email.is_empty() {
        renderer.field("email", &token.email);
    }
}
