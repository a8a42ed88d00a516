//! engine::guard
//!
//! Lock Guard: refuse to touch a dataset whose key is not loaded.
//!
//! # Invariants
//!
//! - Read-only: only `keystatus` is queried
//! - Runs strictly before any snapshot is created
//! - Only `available` passes for an encrypted dataset; every other status
//!   (including one we do not recognise) is fatal
//!
//! The standalone `zfs-check-unlocked` tool calls [`check_mountpoint`] per
//! path and succeeds iff all pass.

use std::fmt;

use crate::core::types::{DatasetName, KeyStatus, MountPoint};
use crate::zfs::ZfsOps;

use super::errors::LifecycleError;
use super::resolve::{resolve, ResolvedDataset};

/// A passing lock check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// Encrypted, and the named encryption root's key is loaded.
    Unlocked(DatasetName),
    /// Not encrypted at all.
    NotEncrypted,
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Unlocked(root) => write!(f, "unlocked (encryption root {})", root),
            LockState::NotEncrypted => write!(f, "not encrypted"),
        }
    }
}

/// Check an (optional) encryption root.
///
/// # Errors
///
/// - `DatasetLocked` if the key is unavailable
/// - `UnexpectedKeyStatus` for any other non-available status
/// - `ZfsQuery` if the status cannot be read
pub fn check(zfs: &dyn ZfsOps, encryption_root: Option<&DatasetName>) -> Result<LockState, LifecycleError> {
    let Some(root) = encryption_root else {
        return Ok(LockState::NotEncrypted);
    };

    let status = zfs
        .key_status(root)
        .map_err(|e| LifecycleError::query(format!("read keystatus of {}", root), e))?;

    match status {
        KeyStatus::Available => Ok(LockState::Unlocked(root.clone())),
        KeyStatus::Unavailable => Err(LifecycleError::DatasetLocked { root: root.clone() }),
        KeyStatus::Other(status) => Err(LifecycleError::UnexpectedKeyStatus {
            root: root.clone(),
            status,
        }),
    }
}

/// Resolve a mount point and check it in one step.
pub fn check_mountpoint(
    zfs: &dyn ZfsOps,
    mountpoint: &MountPoint,
) -> Result<(ResolvedDataset, LockState), LifecycleError> {
    let resolved = resolve(zfs, mountpoint)?;
    let state = check(zfs, resolved.encryption_root.as_ref())?;
    Ok((resolved, state))
}
