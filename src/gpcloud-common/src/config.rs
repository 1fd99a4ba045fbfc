//! `config.toml` loading.
//!
//! A missing file yields the defaults. `GPCLOUD_HOST` overrides the cloud host
//! after the file is read; command-line flags are applied by the caller last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::dirs::AppDirs;
use crate::http_client::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding `cloud_host`.
pub const GPCLOUD_HOST_ENV: &str = "GPCLOUD_HOST";

/// Default cloud service host.
pub const DEFAULT_CLOUD_HOST: &str = "https://cloud.ganttproject.biz";

/// Default browser sign-in page.
pub const DEFAULT_SIGNIN_URL: &str = "https://cloud.ganttproject.biz/__/auth/desktop/";

/// Default browser registration page.
pub const DEFAULT_SIGNUP_URL: &str = "https://cloud.ganttproject.biz/__/auth/signup/";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid URL for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("Home directory not found")]
    NoHome,
}

/// User configuration for the cloud login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Base URL of the cloud service API.
    pub cloud_host: String,
    /// Browser page that signs the user in and redirects to the local listener.
    pub signin_url: String,
    /// Browser page for creating a new account.
    pub signup_url: String,
    /// Whole-request timeout for the token check.
    pub request_timeout_secs: u64,
    /// TCP connect timeout for the token check.
    pub connect_timeout_secs: u64,
    /// How long the local listener waits for the browser redirect.
    pub listener_timeout_secs: u64,
    /// Reject callbacks that do not echo the per-session `state` value.
    pub require_state: bool,
    /// Addresses used to decide whether the machine is online at all.
    pub probe_addresses: Vec<String>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            cloud_host: DEFAULT_CLOUD_HOST.to_string(),
            signin_url: DEFAULT_SIGNIN_URL.to_string(),
            signup_url: DEFAULT_SIGNUP_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            listener_timeout_secs: 300,
            require_state: true,
            probe_addresses: vec!["1.1.1.1:443".to_string(), "8.8.8.8:53".to_string()],
        }
    }
}

impl CloudConfig {
    /// Load `config.toml` from the GPCloud home directory, then apply the
    /// environment. Validation is left to the caller so flags can still
    /// override the result.
    pub fn load_default() -> Result<Self, ConfigError> {
        let dirs = AppDirs::new().ok_or(ConfigError::NoHome)?;
        Self::load_with_env(&dirs.config_file())
    }

    /// Load `path` and apply the environment overrides on top.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), host = %config.cloud_host, "Loaded config");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var(GPCLOUD_HOST_ENV)
            && !host.is_empty()
        {
            debug!(host = %host, "Using {GPCLOUD_HOST_ENV}");
            self.cloud_host = host;
        }
    }

    /// Check that every URL field parses and uses http or https.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("cloud_host", &self.cloud_host),
            ("signin_url", &self.signin_url),
            ("signup_url", &self.signup_url),
        ] {
            let valid = url::Url::parse(value)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::InvalidUrl {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Origin of the cloud service, e.g. `https://cloud.ganttproject.biz`.
    pub fn cloud_origin(&self) -> String {
        match url::Url::parse(&self.cloud_host) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => self.cloud_host.trim_end_matches('/').to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn listener_timeout(&self) -> Duration {
        Duration::from_secs(self.listener_timeout_secs)
    }
}
