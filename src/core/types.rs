//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`MountPoint`] - Absolute, lexically normalized mountpoint path
//! - [`DatasetName`] - Validated ZFS dataset name
//! - [`SnapshotName`] - Short snapshot name (the part after `@`)
//! - [`SnapshotSpec`] - Fully qualified `dataset@snapshot`
//! - [`KeyStatus`] - Encryption key status of an encryption root
//! - [`CreationTime`] - Snapshot creation instant as recorded by ZFS
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a malformed name never reaches a `zfs` command
//! line.
//!
//! # Examples
//!
//! ```
//! use zfs_restic::core::types::{DatasetName, SnapshotName, SnapshotSpec};
//!
//! let dataset = DatasetName::new("tank/family").unwrap();
//! let name = SnapshotName::new("zfs-restic-4821-hostA-20240115-020000").unwrap();
//! let spec = SnapshotSpec::new(dataset, name);
//! assert_eq!(
//!     spec.to_string(),
//!     "tank/family@zfs-restic-4821-hostA-20240115-020000"
//! );
//!
//! assert!(DatasetName::new("tank@snap").is_err());
//! assert!(SnapshotName::new("a/b").is_err());
//! ```

use std::fmt;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local, TimeZone, Utc};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid mount point: {0}")]
    InvalidMountPoint(String),

    #[error("invalid dataset name: {0}")]
    InvalidDatasetName(String),

    #[error("invalid snapshot name: {0}")]
    InvalidSnapshotName(String),

    #[error("invalid creation time: {0}")]
    InvalidCreationTime(String),
}

/// An absolute mountpoint path.
///
/// Relative input is joined onto a base directory and `.`/`..` components
/// are folded lexically. Symlinks are never followed: the result must
/// match the dataset registry's `mountpoint` value string-for-string.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use zfs_restic::core::types::MountPoint;
///
/// let mp = MountPoint::resolve("family/../family/", Path::new("/mnt/tank")).unwrap();
/// assert_eq!(mp.as_str(), "/mnt/tank/family");
///
/// assert!(MountPoint::new("relative/path").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountPoint(String);

impl MountPoint {
    /// Create a mount point from an already absolute path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidMountPoint` if the path is relative, empty,
    /// or not valid UTF-8.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, TypeError> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(TypeError::InvalidMountPoint(format!(
                "'{}' is not absolute",
                path.display()
            )));
        }
        Self::normalize(path)
    }

    /// Resolve user input against `base` (normally the current directory).
    pub fn resolve(input: impl AsRef<Path>, base: &Path) -> Result<Self, TypeError> {
        let input = input.as_ref();
        if input.as_os_str().is_empty() {
            return Err(TypeError::InvalidMountPoint("path is empty".into()));
        }
        if input.is_absolute() {
            Self::normalize(input)
        } else {
            Self::new(base.join(input))
        }
    }

    fn normalize(path: &Path) -> Result<Self, TypeError> {
        let mut out = PathBuf::from("/");
        for component in path.components() {
            match component {
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    out.pop();
                }
                Component::Normal(part) => out.push(part),
            }
        }

        out.to_str().map(|s| Self(s.to_string())).ok_or_else(|| {
            TypeError::InvalidMountPoint(format!("'{}' is not valid UTF-8", path.display()))
        })
    }

    /// Get the mount point as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the mount point as a path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated ZFS dataset name such as `tank/family`.
///
/// Must be non-empty, must not start or end with `/`, and must not contain
/// `@`, `#`, whitespace, or control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetName(String);

impl DatasetName {
    /// Create a new validated dataset name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();

        if name.is_empty() {
            return Err(TypeError::InvalidDatasetName(
                "dataset name cannot be empty".into(),
            ));
        }
        if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
            return Err(TypeError::InvalidDatasetName(format!(
                "'{}' has an empty path component",
                name
            )));
        }
        if let Some(c) = name
            .chars()
            .find(|c| *c == '@' || *c == '#' || c.is_whitespace() || c.is_control())
        {
            return Err(TypeError::InvalidDatasetName(format!(
                "'{}' contains forbidden character {:?}",
                name, c
            )));
        }

        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The short name of a snapshot (everything after `@`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotName(String);

impl SnapshotName {
    /// Create a new validated snapshot name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();

        if name.is_empty() {
            return Err(TypeError::InvalidSnapshotName(
                "snapshot name cannot be empty".into(),
            ));
        }
        if let Some(c) = name.chars().find(|c| {
            !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        }) {
            return Err(TypeError::InvalidSnapshotName(format!(
                "'{}' contains forbidden character {:?}",
                name, c
            )));
        }

        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully qualified snapshot: `dataset@name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotSpec {
    dataset: DatasetName,
    name: SnapshotName,
}

impl SnapshotSpec {
    /// Combine a dataset and a short snapshot name.
    pub fn new(dataset: DatasetName, name: SnapshotName) -> Self {
        Self { dataset, name }
    }

    /// Parse `dataset@name` as printed by `zfs list -t snapshot`.
    pub fn parse(spec: &str) -> Result<Self, TypeError> {
        let (dataset, name) = spec.split_once('@').ok_or_else(|| {
            TypeError::InvalidSnapshotName(format!("'{}' is missing '@'", spec))
        })?;
        Ok(Self::new(DatasetName::new(dataset)?, SnapshotName::new(name)?))
    }

    /// The snapshotted dataset.
    pub fn dataset(&self) -> &DatasetName {
        &self.dataset
    }

    /// The short snapshot name.
    pub fn name(&self) -> &SnapshotName {
        &self.name
    }
}

impl fmt::Display for SnapshotSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.dataset, self.name)
    }
}

/// Key status of an encryption root (`zfs get keystatus`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    /// Key is loaded; data is readable.
    Available,
    /// Key is not loaded (`unavailable`, or `locked` on some platforms).
    Unavailable,
    /// Any other value, kept verbatim for diagnostics.
    Other(String),
}

impl KeyStatus {
    /// Parse the raw property value.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "available" => KeyStatus::Available,
            "unavailable" | "locked" => KeyStatus::Unavailable,
            other => KeyStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStatus::Available => write!(f, "available"),
            KeyStatus::Unavailable => write!(f, "unavailable"),
            KeyStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Snapshot creation instant as recorded by the filesystem.
///
/// Values above 1e12 are interpreted as nanoseconds since the epoch,
/// anything else as seconds.
///
/// # Example
///
/// ```
/// use zfs_restic::core::types::CreationTime;
///
/// let t = CreationTime::from_zfs_value("1705284000").unwrap();
/// assert_eq!(t.epoch_seconds(), 1705284000);
///
/// let ns = CreationTime::from_zfs_value("1705284000000000000").unwrap();
/// assert_eq!(ns, t);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CreationTime(DateTime<Utc>);

impl CreationTime {
    /// Threshold above which the raw value is nanoseconds.
    const NANOS_THRESHOLD: i64 = 1_000_000_000_000;

    /// Parse the parsable (`-p`) value of the `creation` property.
    pub fn from_zfs_value(raw: &str) -> Result<Self, TypeError> {
        let raw = raw.trim();
        let mut epoch: i64 = raw
            .parse()
            .map_err(|_| TypeError::InvalidCreationTime(format!("'{}' is not an integer", raw)))?;
        if epoch > Self::NANOS_THRESHOLD {
            epoch /= 1_000_000_000;
        }
        Self::from_epoch_seconds(epoch)
    }

    /// Build from seconds since the Unix epoch.
    pub fn from_epoch_seconds(epoch: i64) -> Result<Self, TypeError> {
        Utc.timestamp_opt(epoch, 0)
            .single()
            .map(Self)
            .ok_or_else(|| TypeError::InvalidCreationTime(format!("{} is out of range", epoch)))
    }

    /// Seconds since the Unix epoch.
    pub fn epoch_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// The instant in UTC.
    pub fn as_utc(&self) -> DateTime<Utc> {
        self.0
    }

    /// Format for `restic backup --time`, which takes local wall-clock time.
    pub fn restic_format(&self) -> String {
        self.0
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

impl fmt::Display for CreationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
