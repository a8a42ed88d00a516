//! engine::resolve
//!
//! Dataset Resolver: mount point to dataset and encryption root.
//!
//! # Matching
//!
//! A dataset matches only if its registered `mountpoint` property is
//! string-equal to the (lexically normalized) input. Parents are never
//! searched and symlinks are never followed: backing up `/mnt/tank` when the
//! caller asked for `/mnt/tank/family` would silently back up the wrong
//! data.

use crate::core::types::{DatasetName, MountPoint};
use crate::zfs::{MountEntry, ZfsOps};

use super::errors::LifecycleError;

/// A mount point resolved against the dataset registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDataset {
    /// The mount point as given (normalized)
    pub mountpoint: MountPoint,
    /// Dataset mounted there
    pub dataset: DatasetName,
    /// Encryption root governing the dataset, if encrypted
    pub encryption_root: Option<DatasetName>,
}

/// Find the registry entry whose mountpoint equals `mountpoint` exactly.
///
/// The first match wins if the registry lists several.
pub fn find_dataset<'a>(entries: &'a [MountEntry], mountpoint: &MountPoint) -> Option<&'a MountEntry> {
    entries.iter().find(|e| e.mountpoint == mountpoint.as_str())
}

/// Resolve a mount point.
///
/// # Errors
///
/// - `DatasetNotFound` if no dataset is mounted exactly there
/// - `ZfsQuery` if the registry cannot be read
pub fn resolve(zfs: &dyn ZfsOps, mountpoint: &MountPoint) -> Result<ResolvedDataset, LifecycleError> {
    let entries = zfs
        .list_mountpoints()
        .map_err(|e| LifecycleError::query("list ZFS datasets", e))?;

    let entry = find_dataset(&entries, mountpoint).ok_or_else(|| LifecycleError::DatasetNotFound {
        mountpoint: mountpoint.to_string(),
    })?;

    let encryption_root = zfs.encryption_root(&entry.dataset).map_err(|e| {
        LifecycleError::query(format!("read encryptionroot of {}", entry.dataset), e)
    })?;

    Ok(ResolvedDataset {
        mountpoint: mountpoint.clone(),
        dataset: entry.dataset.clone(),
        encryption_root,
    })
}
