//! engine::prereq
//!
//! Prerequisite verification, run once before the lifecycle starts.
//!
//! # Checks
//!
//! - An explicit `--restic-bin` must be an existing, executable file
//! - `zfs version` and `restic version` must both succeed; their output is
//!   returned for the run log
//! - The SHA-256 of the running binary identifies the build in logs

use std::fs::File;
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::restic::BackupRunner;
use crate::zfs::ZfsOps;

use super::errors::LifecycleError;

/// Version lines of the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersions {
    /// Output of `zfs version`
    pub zfs: Vec<String>,
    /// Output of `restic version`
    pub restic: Vec<String>,
}

/// Check that both tools run.
///
/// # Errors
///
/// `ToolNotAvailable` naming the first tool that is missing or fails.
pub fn verify(zfs: &dyn ZfsOps, restic: &dyn BackupRunner) -> Result<ToolVersions, LifecycleError> {
    let zfs_version = zfs.version().map_err(|e| LifecycleError::ToolNotAvailable {
        tool: "zfs",
        reason: e.to_string(),
    })?;
    let restic_version = restic
        .version()
        .map_err(|e| LifecycleError::ToolNotAvailable {
            tool: "restic",
            reason: e.to_string(),
        })?;

    Ok(ToolVersions {
        zfs: zfs_version,
        restic: restic_version,
    })
}

/// Validate an explicitly configured restic binary.
///
/// Returns the canonical path.
pub fn validate_executable(path: &Path) -> Result<PathBuf, LifecycleError> {
    let unavailable = |reason: String| LifecycleError::ToolNotAvailable {
        tool: "restic",
        reason,
    };

    let resolved = path
        .canonicalize()
        .map_err(|_| unavailable(format!("path is not a file: {}", path.display())))?;
    let metadata = resolved
        .metadata()
        .map_err(|e| unavailable(format!("cannot stat {}: {}", resolved.display(), e)))?;

    if !metadata.is_file() {
        return Err(unavailable(format!(
            "path is not a file: {}",
            resolved.display()
        )));
    }
    if metadata.permissions().mode() & 0o111 == 0 {
        return Err(unavailable(format!(
            "path is not executable: {}",
            resolved.display()
        )));
    }

    Ok(resolved)
}

/// SHA-256 hex digest of a file, read in 1 MiB chunks.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1 << 20];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Name and digest of the running executable, for the run log.
pub fn binary_digest() -> Option<(String, String)> {
    let exe = std::env::current_exe().ok()?;
    let name = exe.file_name()?.to_string_lossy().into_owned();
    let digest = file_digest(&exe).ok()?;
    Some((name, digest))
}
