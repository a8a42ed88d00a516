//! engine
//!
//! Orchestrates one backup run: Resolve -> Lock check -> Snapshot -> Backup
//! -> Cleanup.
//!
//! # Architecture
//!
//! The engine talks to the outside world only through the [`ZfsOps`] and
//! [`BackupRunner`] capability traits, so every path through the state
//! machine can be driven by the in-memory mocks.
//!
//! 1. **Resolve** ([`resolve`]): mount point to dataset and encryption root
//! 2. **Guard** ([`guard`]): refuse locked encryption roots
//! 3. **Snapshot** ([`snapshot`]): create, verify and later destroy
//! 4. **Lifecycle** ([`lifecycle`]): drive the above and restic in order
//!
//! [`prereq`] runs before all of them and checks the tools exist.
//!
//! # Example
//!
//! ```ignore
//! use zfs_restic::engine::{Lifecycle, LifecycleSettings};
//!
//! let report = Lifecycle::new(&zfs, &restic, LifecycleSettings::default(), naming)
//!     .run(&mountpoint, &passthrough);
//! std::process::exit(report.exit_code() as i32);
//! ```
//!
//! [`ZfsOps`]: crate::zfs::ZfsOps
//! [`BackupRunner`]: crate::restic::BackupRunner

pub mod errors;
pub mod guard;
pub mod lifecycle;
pub mod prereq;
pub mod resolve;
pub mod snapshot;

pub use errors::LifecycleError;
pub use guard::{check, check_mountpoint, LockState};
pub use lifecycle::{Lifecycle, LifecycleReport, LifecycleSettings, LifecycleState};
pub use prereq::{verify, ToolVersions};
pub use resolve::{find_dataset, resolve, ResolvedDataset};
pub use snapshot::{SnapshotHandle, SnapshotManager};

use std::path::PathBuf;

use crate::ui::output::Verbosity;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Base for relative mount points (defaults to the process cwd).
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (errors only).
    pub quiet: bool,
}

impl Context {
    /// Output verbosity for these flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> std::io::Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}
