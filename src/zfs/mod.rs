//! zfs
//!
//! Single interface for all ZFS operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to ZFS. Dataset lookups, key status
//! queries and snapshot create/destroy all go through the [`ZfsOps`] trait.
//! No other module runs the `zfs` binary.
//!
//! # Invariants
//!
//! - Every mutation names exactly one snapshot (`dataset@name`)
//! - All operations return strong types (DatasetName, SnapshotSpec, CreationTime)
//! - A non-zero exit is always an error; output is never guessed at
//!
//! # Example
//!
//! ```ignore
//! use zfs_restic::zfs::{ZfsCli, ZfsOps};
//!
//! let zfs = ZfsCli::new("zfs");
//! for entry in zfs.list_mountpoints()? {
//!     println!("{} -> {}", entry.dataset, entry.mountpoint);
//! }
//! ```

mod interface;
pub mod mock;

pub use interface::{parse_mount_entries, MountEntry, ZfsCli, ZfsError, ZfsOps};
pub(crate) use interface::version_text;
