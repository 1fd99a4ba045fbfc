//! GPCloud CLI library module.
//!
//! - `cli/` - CLI argument parsing and command dispatch
//! - `login` - Sign-in, status and sign-out commands
//! - `styled_output` - Themed terminal output formatting

pub mod cli;
pub mod login;
pub mod styled_output;
