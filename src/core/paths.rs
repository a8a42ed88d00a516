//! core::paths
//!
//! Path routing for snapshot views.
//!
//! ZFS exposes every snapshot read-only under the hidden control directory
//! of the dataset's mountpoint:
//!
//! ```text
//! <mountpoint>/.zfs/snapshot/<snapshot-name>/
//! ```
//!
//! The control directory is reachable even when `snapdir=hidden`.

use std::path::PathBuf;

use crate::core::types::{MountPoint, SnapshotName};

/// Name of the ZFS control directory.
pub const CONTROL_DIR: &str = ".zfs";

/// Subdirectory of the control directory holding snapshot views.
pub const SNAPSHOT_DIR: &str = "snapshot";

/// Directory holding all snapshot views of a dataset.
pub fn snapshot_root(mountpoint: &MountPoint) -> PathBuf {
    mountpoint.as_path().join(CONTROL_DIR).join(SNAPSHOT_DIR)
}

/// Read-only view of one snapshot.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use zfs_restic::core::paths::snapshot_dir;
/// use zfs_restic::core::types::{MountPoint, SnapshotName};
///
/// let mp = MountPoint::new("/mnt/tank/family").unwrap();
/// let name = SnapshotName::new("zfs-restic-1-h-20240115-020000").unwrap();
/// assert_eq!(
///     snapshot_dir(&mp, &name),
///     Path::new("/mnt/tank/family/.zfs/snapshot/zfs-restic-1-h-20240115-020000")
/// );
/// ```
pub fn snapshot_dir(mountpoint: &MountPoint, name: &SnapshotName) -> PathBuf {
    snapshot_root(mountpoint).join(name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_mountpoint() {
        let mp = MountPoint::new("/").unwrap();
        let name = SnapshotName::new("s").unwrap();
        assert_eq!(snapshot_dir(&mp, &name), PathBuf::from("/.zfs/snapshot/s"));
    }
}
