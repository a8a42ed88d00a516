//! zfs-check-unlocked binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    zfs_restic::cli::run_check()
}
