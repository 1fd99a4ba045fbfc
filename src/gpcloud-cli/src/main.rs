//! GPCloud CLI - Main entry point.
//!
//! Commands:
//! - `login` - browser sign-in through a loopback callback listener
//! - `signup` - open the registration page
//! - `status` - validate the stored access token
//! - `logout` - remove stored credentials

use clap::Parser;
use std::process::ExitCode;

use gpcloud_cli::cli::{Cli, ColorMode, LogLevel, dispatch_command};
use gpcloud_cli::styled_output::print_error;

/// Environment variable selecting the log level.
const LOG_LEVEL_ENV: &str = "GPCLOUD_LOG_LEVEL";

fn init_logging(cli: &Cli) {
    let log_level = if cli.trace {
        LogLevel::Trace
    } else if cli.verbose {
        LogLevel::Debug
    } else if let Ok(env_level) = std::env::var(LOG_LEVEL_ENV) {
        LogLevel::from_str_loose(&env_level).unwrap_or(cli.log_level)
    } else {
        cli.log_level
    };

    // RUST_LOG wins when set; otherwise only our crates log below warn.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = log_level.as_filter_str();
        tracing_subscriber::EnvFilter::new(format!(
            "warn,gpcloud_cli={level},gpcloud_login={level},gpcloud_common={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // SAFETY: Environment variable mutations happen early before threads spawn
    match cli.color {
        ColorMode::Never => unsafe { std::env::set_var("NO_COLOR", "1") },
        ColorMode::Always => unsafe { std::env::remove_var("NO_COLOR") },
        ColorMode::Auto => {}
    }

    init_logging(&cli);

    match dispatch_command(cli).await {
        Ok(code) => code,
        Err(e) => {
            print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
