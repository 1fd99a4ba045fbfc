//! Persisted cloud session settings.
//!
//! The desktop application keeps `authToken`, `validity`, `userId` and
//! `websocketToken` as global options. Here they sit behind [`SettingsStore`]
//! so the validator and the sign-in flow can be handed any backing store.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::SETTINGS_FILE;
use crate::types::{CloudSettings, StoredSettings};
use crate::utils::set_file_permissions;

/// Errors raised by settings stores.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read/write access to the cloud session settings.
pub trait SettingsStore: Send + Sync {
    /// Load the current settings. An empty store yields default settings.
    fn load(&self) -> Result<CloudSettings, SettingsError>;

    /// Replace the stored settings.
    fn save(&self, settings: &CloudSettings) -> Result<(), SettingsError>;

    /// Remove all stored settings. Returns true if anything was removed.
    fn clear(&self) -> Result<bool, SettingsError>;
}

/// In-process settings store.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    inner: Mutex<Option<StoredSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `settings`.
    pub fn with_settings(settings: &CloudSettings) -> Self {
        Self {
            inner: Mutex::new(Some(settings.to_stored())),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<CloudSettings, SettingsError> {
        let stored = self.inner.lock().clone().unwrap_or_default();
        Ok(CloudSettings::from_stored(stored))
    }

    fn save(&self, settings: &CloudSettings) -> Result<(), SettingsError> {
        *self.inner.lock() = Some(settings.to_stored());
        Ok(())
    }

    fn clear(&self) -> Result<bool, SettingsError> {
        Ok(self.inner.lock().take().is_some())
    }
}

/// JSON file store, readable only by the owner.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Store settings in `cloud-auth.json` under the given home directory.
    pub fn new(gpcloud_home: &Path) -> Self {
        Self {
            path: gpcloud_home.join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<CloudSettings, SettingsError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No settings file");
            return Ok(CloudSettings::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let stored: StoredSettings =
            serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
                path: self.path.clone(),
                source,
            })?;

        Ok(CloudSettings::from_stored(stored))
    }

    fn save(&self, settings: &CloudSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(&settings.to_stored())?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;
        set_file_permissions(&self.path).map_err(|e| self.io_error(e))?;

        tracing::debug!(path = %self.path.display(), "Saved cloud settings");
        Ok(())
    }

    fn clear(&self) -> Result<bool, SettingsError> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path).map_err(|e| self.io_error(e))?;
        Ok(true)
    }
}
