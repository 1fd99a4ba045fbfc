//! Command execution handlers.

use anyhow::Result;
use std::process::ExitCode;

use gpcloud_common::CloudConfig;

use super::args::{
    Cli, Commands, ConfigOverrides, LoginCommand, LogoutCommand, SignupCommand, StatusCommand,
};
use crate::login::{run_login, run_logout, run_signup, run_status};

/// Dispatch the parsed command to its handler.
///
/// Errors are reported by the caller. `status` returns a failing exit code
/// without an error when the token is not usable.
pub async fn dispatch_command(cli: Cli) -> Result<ExitCode> {
    let config = resolve_config(&cli.overrides)?;

    match cli.command {
        Commands::Login(login_cli) => handle_login(config, login_cli).await,
        Commands::Signup(signup_cli) => handle_signup(config, signup_cli),
        Commands::Status(status_cli) => handle_status(config, status_cli).await,
        Commands::Logout(logout_cli) => handle_logout(logout_cli),
    }
}

/// Build the effective configuration: config file, then environment, then flags.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<CloudConfig> {
    let mut config = match &overrides.config_path {
        Some(path) => CloudConfig::load_with_env(path)?,
        None => CloudConfig::load_default()?,
    };

    if let Some(host) = &overrides.host {
        config.cloud_host = host.clone();
    }
    config.cloud_host = config.cloud_host.trim_end_matches('/').to_string();

    config.validate()?;
    Ok(config)
}

async fn handle_login(mut config: CloudConfig, login_cli: LoginCommand) -> Result<ExitCode> {
    if let Some(secs) = login_cli.timeout_secs {
        config.listener_timeout_secs = secs;
    }
    run_login(config, login_cli.no_browser).await?;
    Ok(ExitCode::SUCCESS)
}

fn handle_signup(config: CloudConfig, signup_cli: SignupCommand) -> Result<ExitCode> {
    run_signup(&config, signup_cli.no_browser)?;
    Ok(ExitCode::SUCCESS)
}

async fn handle_status(config: CloudConfig, status_cli: StatusCommand) -> Result<ExitCode> {
    let authenticated = run_status(&config, status_cli.local).await?;
    Ok(if authenticated {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn handle_logout(logout_cli: LogoutCommand) -> Result<ExitCode> {
    run_logout(logout_cli.yes)?;
    Ok(ExitCode::SUCCESS)
}
