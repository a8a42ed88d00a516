//! zfs-restic-backup binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    zfs_restic::cli::run_backup()
}
