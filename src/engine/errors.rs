//! engine::errors
//!
//! Error taxonomy of a backup run.
//!
//! Every variant is terminal for the current invocation; nothing is retried
//! automatically. A failed restic run is deliberately absent: it is an
//! outcome ([`BackupOutcome`](crate::restic::BackupOutcome)), not an error.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::{DatasetName, SnapshotSpec};
use crate::zfs::ZfsError;

/// Errors that end a backup run (or, for `SnapshotDestroyFailed`, that are
/// reported alongside a successful one).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A required external tool is missing or broken.
    #[error("{tool} not available: {reason}")]
    ToolNotAvailable {
        /// Tool name (`zfs`, `restic`)
        tool: &'static str,
        /// Why it is unusable
        reason: String,
    },

    /// The mount point is not an existing directory.
    #[error("path {} not found", .path.display())]
    SourceNotFound {
        /// The path that was checked
        path: PathBuf,
    },

    /// A read-only ZFS query failed.
    #[error("failed to {action}: {source}")]
    ZfsQuery {
        /// What was being looked up
        action: String,
        /// Underlying failure
        #[source]
        source: ZfsError,
    },

    /// No dataset's mountpoint equals the given path.
    #[error("no ZFS dataset with mountpoint {mountpoint}")]
    DatasetNotFound {
        /// The mount point that was looked up
        mountpoint: String,
    },

    /// The encryption root's key is not loaded.
    #[error("encryption root {root} is LOCKED - unlock the dataset first")]
    DatasetLocked {
        /// The locked encryption root
        root: DatasetName,
    },

    /// The encryption root reported a key status we do not understand.
    #[error("unexpected keystatus '{status}' for encryption root {root}")]
    UnexpectedKeyStatus {
        /// The encryption root
        root: DatasetName,
        /// Raw status value
        status: String,
    },

    /// The snapshot could not be created or its view could not be used.
    #[error("failed to create snapshot {snapshot}: {reason}")]
    SnapshotCreateFailed {
        /// The snapshot that was requested (`dataset@name`)
        snapshot: String,
        /// What went wrong (and whether it was rolled back)
        reason: String,
    },

    /// The snapshot could not be destroyed.
    #[error("failed to destroy snapshot {snapshot}: {source} - remove it manually")]
    SnapshotDestroyFailed {
        /// The snapshot left behind
        snapshot: SnapshotSpec,
        /// Underlying failure
        #[source]
        source: ZfsError,
    },
}

impl LifecycleError {
    /// Wrap a query failure with a description of what was being read.
    pub fn query(action: impl Into<String>, source: ZfsError) -> Self {
        LifecycleError::ZfsQuery {
            action: action.into(),
            source,
        }
    }
}
