//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! An explicit `--config <path>` must exist. Otherwise the first existing
//! file of these is used:
//! 1. `$ZFS_RESTIC_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/zfs-restic/config.toml`
//! 3. `~/.zfs-restic/config.toml`
//! 4. `/etc/zfs-restic/config.toml`
//!
//! No file at all is not an error; defaults apply.
//!
//! # Example
//!
//! ```no_run
//! use zfs_restic::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("restic: {}", config.restic_bin());
//! println!("prefix: {}", config.snapshot_prefix());
//! ```

pub mod schema;

pub use schema::FileConfig;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::naming::DEFAULT_PREFIX;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "ZFS_RESTIC_CONFIG";

/// System-wide config location.
pub const SYSTEM_CONFIG: &str = "/etc/zfs-restic/config.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Raw file contents (all fields optional)
    pub file: FileConfig,
    /// Path the config was loaded from, if any
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` is given but unreadable, or if the
    /// selected file cannot be parsed or fails validation.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }
        Self::load_first(&Self::search_paths())
    }

    /// Candidate locations, in search order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("zfs-restic/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".zfs-restic/config.toml"));
        }
        paths.push(PathBuf::from(SYSTEM_CONFIG));
        paths
    }

    /// Load the first existing file among `candidates`, or defaults.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Config, ConfigError> {
        match candidates.iter().find(|p| p.exists()) {
            Some(path) => Self::load_file(path),
            None => Ok(Config::default()),
        }
    }

    /// Read, parse and validate one config file.
    fn load_file(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        Ok(Config {
            file,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Restic binary. Defaults to `restic` (looked up on `PATH`).
    pub fn restic_bin(&self) -> &str {
        self.file.restic_bin.as_deref().unwrap_or("restic")
    }

    /// ZFS binary. Defaults to `zfs` (looked up on `PATH`).
    pub fn zfs_bin(&self) -> &str {
        self.file.zfs_bin.as_deref().unwrap_or("zfs")
    }

    /// Snapshot name prefix. Defaults to `zfs-restic`.
    pub fn snapshot_prefix(&self) -> &str {
        self.file.snapshot_prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    /// Whether to warn about retained snapshots. Defaults to `true`.
    pub fn warn_stale_snapshots(&self) -> bool {
        self.file.warn_stale_snapshots.unwrap_or(true)
    }

    /// Whether to log the binary digest. Defaults to `true`.
    pub fn log_binary_digest(&self) -> bool {
        self.file.log_binary_digest.unwrap_or(true)
    }

    /// Path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_files() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_first(&[temp.path().join("missing.toml")]).unwrap();

        assert!(config.loaded_from().is_none());
        assert_eq!(config.restic_bin(), "restic");
        assert_eq!(config.zfs_bin(), "zfs");
        assert_eq!(config.snapshot_prefix(), "zfs-restic");
        assert!(config.warn_stale_snapshots());
        assert!(config.log_binary_digest());
    }

    #[test]
    fn first_existing_wins() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.toml");
        let second = temp.path().join("second.toml");
        fs::write(&second, "snapshot_prefix = \"second\"").unwrap();

        let config = Config::load_first(&[first.clone(), second.clone()]).unwrap();
        assert_eq!(config.snapshot_prefix(), "second");
        assert_eq!(config.loaded_from(), Some(second.as_path()));

        fs::write(&first, "snapshot_prefix = \"first\"").unwrap();
        let config = Config::load_first(&[first, second]).unwrap();
        assert_eq!(config.snapshot_prefix(), "first");
    }

    #[test]
    fn explicit_missing_is_error() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(&temp.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn explicit_file_loaded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            restic_bin = "/opt/restic/bin/restic"
            zfs_bin = "/usr/sbin/zfs"
            log_binary_digest = false
            "#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.restic_bin(), "/opt/restic/bin/restic");
        assert_eq!(config.zfs_bin(), "/usr/sbin/zfs");
        assert!(!config.log_binary_digest());
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "retention = 7").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn invalid_prefix_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "snapshot_prefix = \"a@b\"").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
