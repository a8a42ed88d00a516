//! check command - lock check for one or more mount points
//!
//! Output is unstamped, one line per failing path on stderr, for use in
//! shell guards such as `zfs-check-unlocked /mnt/secrets && . /mnt/secrets/env`.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use super::{load_config, zfs_bin};
use crate::cli::args::CheckCli;
use crate::core::types::MountPoint;
use crate::engine::{check_mountpoint, Context, LifecycleError};
use crate::ui::output;
use crate::zfs::{ZfsCli, ZfsOps};

/// Check every non-blank path; exit 1 if any fails.
pub fn check(cli: CheckCli, ctx: &Context) -> Result<ExitCode> {
    let config = load_config(None, ctx)?;
    let zfs = ZfsCli::new(zfs_bin(cli.zfs_bin, &config));
    let base = ctx.base_dir().context("cannot determine current directory")?;

    let mut failed = false;
    for path in cli.paths.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if let Err(message) = check_path(&zfs, path, &base) {
            output::diagnostic(message);
            failed = true;
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Check one path, returning the diagnostic line on failure.
///
/// The path need not exist: a locked dataset is usually not mounted, so only
/// its registered mountpoint is consulted.
pub fn check_path(zfs: &dyn ZfsOps, path: &str, base: &Path) -> Result<(), String> {
    let mountpoint = MountPoint::resolve(path, base).map_err(|e| format!("{}: {}", path, e))?;

    match check_mountpoint(zfs, &mountpoint) {
        Ok(_) => Ok(()),
        Err(LifecycleError::DatasetNotFound { .. }) => {
            Err(format!("No ZFS dataset with mountpoint: {}", mountpoint))
        }
        Err(LifecycleError::DatasetLocked { root }) => Err(format!(
            "Dataset is LOCKED: {} (encryption root {}) - unlock the dataset first",
            mountpoint, root
        )),
        Err(LifecycleError::UnexpectedKeyStatus { root, status }) => Err(format!(
            "Unexpected keystatus '{}' for {} ({})",
            status, root, mountpoint
        )),
        Err(e) => Err(format!("{}: {}", mountpoint, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::KeyStatus;
    use crate::zfs::mock::MockZfs;

    fn zfs() -> MockZfs {
        MockZfs::new()
            .with_dataset("tank/plain", "/mnt/tank/plain")
            .with_dataset("tank/secrets", "/mnt/tank/secrets")
            .with_dataset("tank/odd", "/mnt/tank/odd")
            .with_encryption_root("tank/secrets", "tank/secrets")
            .with_encryption_root("tank/odd", "tank/odd")
            .with_key_status("tank/odd", KeyStatus::Other("-".into()))
    }

    #[test]
    fn unencrypted_passes() {
        assert!(check_path(&zfs(), "/mnt/tank/plain", Path::new("/")).is_ok());
    }

    #[test]
    fn unlocked_passes() {
        let zfs = zfs().with_key_status("tank/secrets", KeyStatus::Available);
        assert!(check_path(&zfs, "/mnt/tank/secrets", Path::new("/")).is_ok());
    }

    #[test]
    fn locked_message() {
        let zfs = zfs().with_key_status("tank/secrets", KeyStatus::Unavailable);
        assert_eq!(
            check_path(&zfs, "/mnt/tank/secrets", Path::new("/")).unwrap_err(),
            "Dataset is LOCKED: /mnt/tank/secrets (encryption root tank/secrets) - unlock the dataset first"
        );
    }

    #[test]
    fn unexpected_status_message() {
        assert_eq!(
            check_path(&zfs(), "/mnt/tank/odd", Path::new("/")).unwrap_err(),
            "Unexpected keystatus '-' for tank/odd (/mnt/tank/odd)"
        );
    }

    #[test]
    fn relative_path_made_absolute() {
        assert!(check_path(&zfs(), "plain", Path::new("/mnt/tank")).is_ok());
        assert_eq!(
            check_path(&zfs(), "../nope", Path::new("/mnt/tank")).unwrap_err(),
            "No ZFS dataset with mountpoint: /mnt/nope"
        );
    }
}
