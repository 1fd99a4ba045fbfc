//! Styled CLI output.
//!
//! Messages go to stderr with an icon and a theme-aware color. Colors are
//! dropped when stderr is not a terminal or `NO_COLOR` is set.

use std::io::{IsTerminal, Write};

/// Check if colors should be disabled based on NO_COLOR env var.
fn colors_disabled() -> bool {
    std::env::var("NO_COLOR")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

struct Theme {
    success: &'static str,
    error: &'static str,
    warning: &'static str,
    info: &'static str,
    dim: &'static str,
}

const RESET: &str = "\x1b[0m";

static LIGHT: Theme = Theme {
    success: "\x1b[38;2;0;150;125m",
    error: "\x1b[38;2;217;61;61m",
    warning: "\x1b[38;2;201;154;46m",
    info: "\x1b[38;2;0;100;160m",
    dim: "\x1b[38;2;100;100;100m",
};

static DARK: Theme = Theme {
    success: "\x1b[38;2;0;245;212m",
    error: "\x1b[38;2;255;107;107m",
    warning: "\x1b[38;2;255;200;87m",
    info: "\x1b[38;2;72;202;228m",
    dim: "\x1b[38;2;130;154;177m",
};

/// Light background when COLORFGBG says so; dark otherwise.
fn theme() -> &'static Theme {
    let light = std::env::var("COLORFGBG")
        .ok()
        .and_then(|v| v.split(';').next_back().and_then(|bg| bg.parse::<u8>().ok()))
        .is_some_and(|bg| bg >= 7);
    if light { &LIGHT } else { &DARK }
}

/// Message type for styled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Success,
    Error,
    Warning,
    Info,
    /// Secondary detail lines
    Dim,
}

impl MessageType {
    fn icon(&self) -> &'static str {
        match self {
            MessageType::Success => "[OK]",
            MessageType::Error => "[ERROR]",
            MessageType::Warning => "[WARN]",
            MessageType::Info => "[INFO]",
            MessageType::Dim => "-",
        }
    }

    fn color(&self) -> &'static str {
        let theme = theme();
        match self {
            MessageType::Success => theme.success,
            MessageType::Error => theme.error,
            MessageType::Warning => theme.warning,
            MessageType::Info => theme.info,
            MessageType::Dim => theme.dim,
        }
    }
}

/// Format a message with its icon, colored if `use_colors`.
fn format_styled(msg_type: MessageType, message: &str, use_colors: bool) -> String {
    if use_colors {
        format!("{}{} {}{}", msg_type.color(), msg_type.icon(), message, RESET)
    } else {
        format!("{} {}", msg_type.icon(), message)
    }
}

/// Print a styled message to stderr.
pub fn print_message(msg_type: MessageType, message: &str) {
    let use_colors = !colors_disabled() && std::io::stderr().is_terminal();
    let _ = writeln!(
        std::io::stderr(),
        "{}",
        format_styled(msg_type, message, use_colors)
    );
}

pub fn print_success(message: &str) {
    print_message(MessageType::Success, message);
}

pub fn print_error(message: &str) {
    print_message(MessageType::Error, message);
}

pub fn print_warning(message: &str) {
    print_message(MessageType::Warning, message);
}

pub fn print_info(message: &str) {
    print_message(MessageType::Info, message);
}

pub fn print_dim(message: &str) {
    print_message(MessageType::Dim, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_message_type_icons() {
        assert_eq!(MessageType::Success.icon(), "[OK]");
        assert_eq!(MessageType::Error.icon(), "[ERROR]");
        assert_eq!(MessageType::Warning.icon(), "[WARN]");
        assert_eq!(MessageType::Info.icon(), "[INFO]");
        assert_eq!(MessageType::Dim.icon(), "-");
    }

    #[test]
    fn test_format_styled() {
        assert_eq!(
            format_styled(MessageType::Success, "done", false),
            "[OK] done"
        );
        let colored = format_styled(MessageType::Error, "failed", true);
        assert!(colored.starts_with("\x1b["));
        assert!(colored.ends_with(RESET));
        assert!(colored.contains("[ERROR] failed"));
    }

    #[test]
    #[serial]
    fn test_colors_disabled() {
        // SAFETY: These tests run serially and we restore env vars immediately
        unsafe { std::env::set_var("NO_COLOR", "1") };
        assert!(colors_disabled());
        unsafe { std::env::set_var("NO_COLOR", "true") };
        assert!(colors_disabled());
        unsafe { std::env::set_var("NO_COLOR", "0") };
        assert!(!colors_disabled());
        unsafe { std::env::set_var("NO_COLOR", "false") };
        assert!(!colors_disabled());
        unsafe { std::env::set_var("NO_COLOR", "") };
        assert!(!colors_disabled());
        unsafe { std::env::remove_var("NO_COLOR") };
    }

    #[test]
    #[serial]
    fn test_light_theme_detection() {
        // SAFETY: serialized with other environment tests
        unsafe { std::env::set_var("COLORFGBG", "0;15") };
        assert_eq!(theme().success, LIGHT.success);
        unsafe { std::env::set_var("COLORFGBG", "15;0") };
        assert_eq!(theme().success, DARK.success);
        unsafe { std::env::remove_var("COLORFGBG") };
    }
}
