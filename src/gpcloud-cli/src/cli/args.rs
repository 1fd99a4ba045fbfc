//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::styles::{AFTER_HELP, get_styles};

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors (default)
    #[default]
    Warn,
    /// Show informational messages, warnings, and errors
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Color output mode for CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if output is a terminal
    #[default]
    Auto,
    /// Always output with colors
    Always,
    /// Never output with colors
    Never,
}

/// GanttProject Cloud sign-in from the command line.
#[derive(Parser, Debug)]
#[command(name = "gpcloud")]
#[command(author, version)]
#[command(about = "Sign in to GanttProject Cloud", long_about = None)]
#[command(styles = get_styles(), after_help = AFTER_HELP)]
pub struct Cli {
    /// Enable verbose output (same as --log-level debug)
    #[arg(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,

    /// Enable trace-level logging for debugging
    #[arg(long = "trace", global = true)]
    pub trace: bool,

    /// Log verbosity
    #[arg(long = "log-level", global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Control color output: auto (default), always, or never
    #[arg(long = "color", global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[clap(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that take precedence over config.toml and the environment.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Cloud host, e.g. https://cloud.ganttproject.biz
    #[arg(long = "host", value_name = "URL", global = true)]
    pub host: Option<String>,

    /// Read configuration from this file instead of config.toml
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in through the browser
    Login(LoginCommand),

    /// Open the GanttProject Cloud registration page
    Signup(SignupCommand),

    /// Check whether the stored access token is still accepted
    Status(StatusCommand),

    /// Remove stored credentials
    Logout(LogoutCommand),
}

/// Login command.
#[derive(Args, Debug)]
pub struct LoginCommand {
    /// Print the sign-in URL instead of opening a browser
    #[arg(long = "no-browser")]
    pub no_browser: bool,

    /// Give up after this many seconds without a response from the browser
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,
}

/// Signup command.
#[derive(Args, Debug)]
pub struct SignupCommand {
    /// Print the registration URL instead of opening a browser
    #[arg(long = "no-browser")]
    pub no_browser: bool,
}

/// Status command.
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Only inspect the stored token, without contacting the cloud
    #[arg(long = "local")]
    pub local: bool,
}

/// Logout command.
#[derive(Args, Debug)]
pub struct LogoutCommand {
    /// Skip confirmation prompt and log out immediately.
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}
