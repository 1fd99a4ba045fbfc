//! Common utilities shared across GPCloud login crates.

pub mod config;
pub mod dirs;
pub mod http_client;

pub use config::{
    CONFIG_FILE, CloudConfig, ConfigError, DEFAULT_CLOUD_HOST, DEFAULT_SIGNIN_URL,
    DEFAULT_SIGNUP_URL, GPCLOUD_HOST_ENV,
};
pub use dirs::{AppDirs, GPCLOUD_HOME_ENV, get_app_dirs, get_gpcloud_home};
pub use http_client::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, USER_AGENT, create_client_with_timeouts,
};
