//! Cross-platform application directories for GPCloud login.
//!
//! - Linux/macOS: `~/.gpcloud`
//! - Windows: `%APPDATA%\gpcloud`
//!
//! Can be overridden with the `GPCLOUD_HOME` environment variable.

use std::path::PathBuf;

/// Application name for directory paths
pub const APP_NAME: &str = "gpcloud";

/// Primary home directory name on Linux/macOS
pub const HOME_DIR_NAME: &str = ".gpcloud";

/// Environment variable overriding the home directory.
pub const GPCLOUD_HOME_ENV: &str = "GPCLOUD_HOME";

/// Application directories structure
#[derive(Debug, Clone)]
pub struct AppDirs {
    /// Directory holding `config.toml` and the persisted cloud settings.
    pub config_dir: PathBuf,
    /// Cache directory (logs and other disposable files).
    pub cache_dir: PathBuf,
}

impl AppDirs {
    /// Get application directories, respecting `GPCLOUD_HOME`.
    ///
    /// Relative `GPCLOUD_HOME` values are resolved against the current
    /// directory so the settings file never lands somewhere unexpected.
    pub fn new() -> Option<Self> {
        if let Ok(home) = std::env::var(GPCLOUD_HOME_ENV)
            && !home.is_empty()
        {
            let home = PathBuf::from(home);
            let home = if home.is_relative() {
                let resolved = std::env::current_dir().ok()?.join(&home);
                resolved.canonicalize().unwrap_or(resolved)
            } else {
                home
            };
            return Some(Self {
                cache_dir: home.join("cache"),
                config_dir: home,
            });
        }

        #[cfg(target_os = "windows")]
        let (config_dir, cache_dir) = {
            let appdata = dirs::config_dir()?;
            let local_appdata = dirs::cache_dir()?;
            (appdata.join(APP_NAME), local_appdata.join(APP_NAME))
        };

        #[cfg(not(target_os = "windows"))]
        let (config_dir, cache_dir) = {
            let home = dirs::home_dir()?.join(HOME_DIR_NAME);
            (home.clone(), home.join("cache"))
        };

        Some(Self {
            config_dir,
            cache_dir,
        })
    }

    /// Get the primary config file path (config.toml)
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(crate::config::CONFIG_FILE)
    }

    /// Ensure all directories exist with owner-only permissions
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.config_dir, &self.cache_dir] {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
                }
            }
        }
        Ok(())
    }
}

/// Get application directories (convenience function)
pub fn get_app_dirs() -> Option<AppDirs> {
    AppDirs::new()
}

/// Get the GPCloud home directory.
pub fn get_gpcloud_home() -> Option<PathBuf> {
    AppDirs::new().map(|dirs| dirs.config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_file_path() {
        let dirs = AppDirs::new().unwrap();
        assert!(dirs.config_file().ends_with("config.toml"));
    }

    #[test]
    #[serial]
    fn test_env_override() {
        let test_path = std::env::temp_dir().join("test-gpcloud");
        // SAFETY: serialized with every other test touching the environment
        unsafe {
            std::env::set_var(GPCLOUD_HOME_ENV, &test_path);
        }
        let dirs = AppDirs::new().unwrap();
        assert_eq!(dirs.config_dir, test_path);
        assert_eq!(dirs.cache_dir, test_path.join("cache"));
        unsafe {
            std::env::remove_var(GPCLOUD_HOME_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_ensure_dirs_creates_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = AppDirs {
            config_dir: tmp.path().join("home"),
            cache_dir: tmp.path().join("home").join("cache"),
        };
        dirs.ensure_dirs().unwrap();
        assert!(dirs.config_dir.is_dir());
        assert!(dirs.cache_dir.is_dir());
    }
}
