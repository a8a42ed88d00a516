//! engine::snapshot
//!
//! Snapshot Manager: create, locate and destroy the run's snapshot.
//!
//! # Creation
//!
//! 1. Generate `<prefix>-<pid>-<host>-<UTC>` from the injected
//!    [`NamingContext`]
//! 2. `zfs snapshot dataset@name` (a collision is a hard failure, never
//!    retried under another name)
//! 3. Read back the creation time ZFS recorded; this, not our clock, is the
//!    point in time of the data
//! 4. Check the `.zfs/snapshot/<name>` view exists
//!
//! If step 3 or 4 fails no backup has run yet, so the fresh snapshot is
//! rolled back before reporting `SnapshotCreateFailed`.

use std::path::PathBuf;

use crate::core::naming::{is_managed, snapshot_name, NamingContext};
use crate::core::paths::snapshot_dir;
use crate::core::types::{CreationTime, DatasetName, SnapshotSpec};
use crate::zfs::{ZfsError, ZfsOps};

use super::errors::LifecycleError;
use super::resolve::ResolvedDataset;

/// A live snapshot bound to its read-only view and creation time.
///
/// The path is only valid until the snapshot is destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    /// `dataset@name`
    pub spec: SnapshotSpec,
    /// `<mountpoint>/.zfs/snapshot/<name>`
    pub path: PathBuf,
    /// Creation time recorded by ZFS
    pub created: CreationTime,
}

/// Creates and destroys snapshots with a fixed name prefix.
pub struct SnapshotManager<'a> {
    zfs: &'a dyn ZfsOps,
    prefix: String,
}

impl<'a> SnapshotManager<'a> {
    /// Create a manager using `prefix` for generated names.
    pub fn new(zfs: &'a dyn ZfsOps, prefix: impl Into<String>) -> Self {
        Self {
            zfs,
            prefix: prefix.into(),
        }
    }

    /// Create a uniquely named snapshot of `target`.
    ///
    /// # Errors
    ///
    /// `SnapshotCreateFailed` if the name is invalid, `zfs snapshot` fails,
    /// or the snapshot cannot be located afterwards (in which case it has
    /// been rolled back, or the message says it could not be).
    pub fn create(
        &self,
        target: &ResolvedDataset,
        naming: &NamingContext,
    ) -> Result<SnapshotHandle, LifecycleError> {
        let name = snapshot_name(&self.prefix, naming).map_err(|e| {
            LifecycleError::SnapshotCreateFailed {
                snapshot: format!("{}@{}-*", target.dataset, self.prefix),
                reason: e.to_string(),
            }
        })?;
        let spec = SnapshotSpec::new(target.dataset.clone(), name);

        self.zfs
            .create_snapshot(&spec)
            .map_err(|e| LifecycleError::SnapshotCreateFailed {
                snapshot: spec.to_string(),
                reason: e.to_string(),
            })?;

        let created = match self.zfs.snapshot_creation(&spec) {
            Ok(created) => created,
            Err(e) => {
                return Err(self.rollback(
                    &spec,
                    format!("could not read creation time: {}", e),
                ))
            }
        };

        let path = snapshot_dir(&target.mountpoint, spec.name());
        if !path.is_dir() {
            return Err(self.rollback(
                &spec,
                format!("snapshot directory {} not found", path.display()),
            ));
        }

        Ok(SnapshotHandle {
            spec,
            path,
            created,
        })
    }

    /// Destroy the fresh snapshot after a post-create check failed.
    fn rollback(&self, spec: &SnapshotSpec, reason: String) -> LifecycleError {
        let reason = match self.zfs.destroy_snapshot(spec) {
            Ok(()) => format!("{} (snapshot rolled back)", reason),
            Err(e) => format!("{} (rollback failed, remove it manually: {})", reason, e),
        };
        LifecycleError::SnapshotCreateFailed {
            snapshot: spec.to_string(),
            reason,
        }
    }

    /// Destroy exactly `spec`.
    ///
    /// # Errors
    ///
    /// `SnapshotDestroyFailed` naming the snapshot left behind.
    pub fn destroy(&self, spec: &SnapshotSpec) -> Result<(), LifecycleError> {
        self.zfs
            .destroy_snapshot(spec)
            .map_err(|source| LifecycleError::SnapshotDestroyFailed {
                snapshot: spec.clone(),
                source,
            })
    }

    /// Snapshots of `dataset` carrying this manager's prefix, i.e. ones
    /// retained by earlier failed or interrupted runs.
    pub fn retained(&self, dataset: &DatasetName) -> Result<Vec<SnapshotSpec>, ZfsError> {
        Ok(self
            .zfs
            .list_snapshots(dataset)?
            .into_iter()
            .filter(|s| is_managed(s.name(), &self.prefix))
            .collect())
    }
}
