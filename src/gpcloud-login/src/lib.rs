//! GPCloud Login - sign-in core for the GanttProject Cloud client.
//!
//! Provides:
//! - A loopback callback listener that receives the access token from the
//!   browser sign-in page
//! - Access token validation against the cloud service
//! - Pluggable settings storage for the resulting credentials
//!
//! Security features:
//! - Listener bound to 127.0.0.1 only, with a per-session `state` nonce
//! - Secure memory handling with secrecy crate
//! - File permissions enforcement (0600)

// Core modules
pub mod constants;
pub mod types;
mod utils;

// Storage
pub mod settings;

// Network
pub mod probe;
pub mod validator;

// Sign-in
mod browser;
pub mod listener;
pub mod signin;

// Re-exports from constants
pub use constants::{ACCESS_TOKEN_CHECK_PATH, SETTINGS_FILE};

// Re-exports from types
pub use types::{CloudSettings, TokenGrant, ValidationOutcome, format_remaining};

// Re-exports from settings
pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsError, SettingsStore};

// Re-exports from probe and validator
pub use probe::{NetworkProbe, TcpNetworkProbe};
pub use validator::{AccessCheck, TokenValidator};

// Re-exports from listener and signin
pub use listener::{CallbackListener, ListenerError, ListenerOptions, TokenCallback};
pub use signin::{PendingSignIn, SignInError, SignInFlow};

// Re-exports from browser and utils
pub use browser::{open_browser, validate_browser_url};
pub use utils::safe_format_key;
