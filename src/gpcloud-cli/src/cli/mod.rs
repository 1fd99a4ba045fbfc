//! CLI argument parsing and command dispatch.
//!
//! - `args` - Command-line argument structures
//! - `styles` - ANSI styling for help output
//! - `handlers` - Command execution handlers

pub mod args;
pub mod handlers;
pub mod styles;

pub use args::{
    Cli, ColorMode, Commands, ConfigOverrides, LogLevel, LoginCommand, LogoutCommand,
    SignupCommand, StatusCommand,
};
pub use handlers::{dispatch_command, resolve_config};
