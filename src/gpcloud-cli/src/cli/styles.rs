//! CLI styling for help output.

use clap::builder::styling::{AnsiColor, Effects, Styles};

/// Help theme with cyan headers and green literals.
pub fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Cyan.on_default())
        .invalid(AnsiColor::Yellow.on_default())
}

/// After-help section documenting environment variables and paths.
pub const AFTER_HELP: &str = color_print::cstr!(
    r#"<cyan,bold>ENVIRONMENT VARIABLES</>
    <yellow>GPCLOUD_HOME</>         Override data directory (default: ~/.gpcloud)
    <yellow>GPCLOUD_HOST</>         Cloud host (alternative to --host)
    <yellow>GPCLOUD_LOG_LEVEL</>    Log verbosity (error, warn, info, debug, trace)
    <yellow>RUST_LOG</>             Full tracing filter, takes precedence over the above
    <yellow>NO_COLOR</>             Disable colored output (set to '1' or 'true')

<cyan,bold>PATHS</>
    <dim>Config</>         $GPCLOUD_HOME/config.toml
    <dim>Credentials</>    $GPCLOUD_HOME/cloud-auth.json"#
);
