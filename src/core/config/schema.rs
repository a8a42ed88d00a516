//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Config values are validated after parsing so a bad prefix or an empty
//! binary path is reported at startup, not halfway through a run.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Configuration file contents.
///
/// # Example
///
/// ```toml
/// restic_bin = "/usr/local/bin/restic"
/// zfs_bin = "/usr/sbin/zfs"
/// snapshot_prefix = "zfs-restic"
/// warn_stale_snapshots = true
/// log_binary_digest = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Path or name of the restic binary
    pub restic_bin: Option<String>,

    /// Path or name of the zfs binary
    pub zfs_bin: Option<String>,

    /// Prefix of generated snapshot names
    pub snapshot_prefix: Option<String>,

    /// Warn about snapshots retained by earlier runs
    pub warn_stale_snapshots: Option<bool>,

    /// Log the SHA-256 of the running binary at startup
    pub log_binary_digest: Option<bool>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(prefix) = &self.snapshot_prefix {
            validate_prefix(prefix)?;
        }

        for (key, value) in [("restic_bin", &self.restic_bin), ("zfs_bin", &self.zfs_bin)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!("{} cannot be empty", key)));
            }
        }

        Ok(())
    }
}

/// Check a snapshot prefix.
///
/// Must be non-empty and use only `[A-Za-z0-9_.:-]`, which keeps generated
/// names valid ZFS snapshot names.
pub fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::InvalidValue(
            "snapshot_prefix cannot be empty".into(),
        ));
    }
    if let Some(c) = prefix
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')))
    {
        return Err(ConfigError::InvalidValue(format!(
            "invalid snapshot_prefix '{}': character {:?} not allowed",
            prefix, c
        )));
    }
    Ok(())
}
