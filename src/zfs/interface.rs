//! zfs::interface
//!
//! The `ZfsOps` capability trait and its `zfs`-CLI implementation.
//!
//! # Architecture
//!
//! Every dataset-registry query and snapshot mutation flows through
//! [`ZfsOps`]. The engine only sees strong types; parsing of the tab
//! separated `-H` output happens here.
//!
//! # Commands
//!
//! | Operation                | Command                                          |
//! |--------------------------|--------------------------------------------------|
//! | `list_mountpoints`       | `zfs list -H -o name,mountpoint`                 |
//! | `encryption_root`        | `zfs get -H -o value encryptionroot <ds>`        |
//! | `key_status`             | `zfs get -H -o value keystatus <ds>`             |
//! | `create_snapshot`        | `zfs snapshot <ds>@<name>`                       |
//! | `snapshot_creation`      | `zfs get -H -p -o value creation <ds>@<name>`    |
//! | `destroy_snapshot`       | `zfs destroy <ds>@<name>`                        |
//! | `list_snapshots`         | `zfs list -H -t snapshot -o name -d 1 <ds>`      |
//! | `version`                | `zfs version`                                    |

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use thiserror::Error;

use crate::core::types::{CreationTime, DatasetName, KeyStatus, SnapshotSpec, TypeError};

/// Errors from ZFS operations.
#[derive(Debug, Error)]
pub enum ZfsError {
    /// The zfs binary could not be found.
    #[error("'{bin}' not found")]
    NotInstalled {
        /// The binary that was looked up
        bin: PathBuf,
    },

    /// The zfs binary could not be started.
    #[error("failed to run '{bin}': {source}")]
    Spawn {
        /// The binary that failed to start
        bin: PathBuf,
        /// The underlying I/O error
        source: io::Error,
    },

    /// A zfs command exited unsuccessfully.
    #[error("'{command}' failed ({}): {stderr}", exit_label(.code))]
    CommandFailed {
        /// The command line that failed
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Trimmed standard error output
        stderr: String,
    },

    /// Output could not be interpreted.
    #[error("unexpected output from '{command}': {message}")]
    Parse {
        /// The command line whose output was bad
        command: String,
        /// What was wrong
        message: String,
    },

    /// A name in the output failed validation.
    #[error(transparent)]
    InvalidName(#[from] TypeError),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit {}", c),
        None => "killed by signal".to_string(),
    }
}

/// One row of the dataset registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Dataset name
    pub dataset: DatasetName,
    /// Registered `mountpoint` property, verbatim (may be `none` or `legacy`)
    pub mountpoint: String,
}

/// Narrow capability interface over the ZFS tooling.
///
/// Implementations: [`ZfsCli`] for real systems and
/// [`MockZfs`](super::mock::MockZfs) for tests.
pub trait ZfsOps {
    /// All filesystem datasets with their registered mountpoints.
    fn list_mountpoints(&self) -> Result<Vec<MountEntry>, ZfsError>;

    /// Encryption root of `dataset`, or `None` if not encrypted.
    fn encryption_root(&self, dataset: &DatasetName) -> Result<Option<DatasetName>, ZfsError>;

    /// Key status of an encryption root.
    fn key_status(&self, root: &DatasetName) -> Result<KeyStatus, ZfsError>;

    /// Create exactly the named snapshot.
    fn create_snapshot(&self, spec: &SnapshotSpec) -> Result<(), ZfsError>;

    /// Creation time recorded by ZFS for a snapshot.
    fn snapshot_creation(&self, spec: &SnapshotSpec) -> Result<CreationTime, ZfsError>;

    /// Destroy exactly the named snapshot.
    fn destroy_snapshot(&self, spec: &SnapshotSpec) -> Result<(), ZfsError>;

    /// Snapshots of `dataset` itself (not of its descendants).
    fn list_snapshots(&self, dataset: &DatasetName) -> Result<Vec<SnapshotSpec>, ZfsError>;

    /// Version lines reported by the tooling.
    fn version(&self) -> Result<Vec<String>, ZfsError>;
}

/// [`ZfsOps`] backed by the `zfs` command line tool.
#[derive(Debug, Clone)]
pub struct ZfsCli {
    bin: PathBuf,
}

impl Default for ZfsCli {
    fn default() -> Self {
        Self::new("zfs")
    }
}

impl ZfsCli {
    /// Use `bin` (a path or a name looked up on `PATH`).
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    /// The configured binary.
    pub fn bin(&self) -> &Path {
        &self.bin
    }

    fn command_line(&self, args: &[&str]) -> String {
        let mut line = self.bin.display().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run `zfs <args>` to completion, capturing output.
    fn output(&self, args: &[&str]) -> Result<Output, ZfsError> {
        Command::new(&self.bin)
            .args(args)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ZfsError::NotInstalled {
                    bin: self.bin.clone(),
                },
                _ => ZfsError::Spawn {
                    bin: self.bin.clone(),
                    source: e,
                },
            })
    }

    /// Run `zfs <args>` and return stdout, failing on non-zero exit.
    fn run(&self, args: &[&str]) -> Result<String, ZfsError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(ZfsError::CommandFailed {
                command: self.command_line(args),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Read one property value; `-` and empty map to `None`.
    fn get_value(&self, property: &str, target: &str) -> Result<Option<String>, ZfsError> {
        let stdout = self.run(&["get", "-H", "-o", "value", property, target])?;
        Ok(property_value(&stdout))
    }
}

/// Interpret `zfs get -H -o value` output.
fn property_value(stdout: &str) -> Option<String> {
    let value = stdout.trim();
    if value.is_empty() || value == "-" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse `zfs list -H -o name,mountpoint` output.
///
/// Lines without a tab are skipped; the mountpoint is everything after the
/// first tab, verbatim.
pub fn parse_mount_entries(stdout: &str) -> Result<Vec<MountEntry>, TypeError> {
    stdout
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(name, mountpoint)| {
            Ok(MountEntry {
                dataset: DatasetName::new(name)?,
                mountpoint: mountpoint.to_string(),
            })
        })
        .collect()
}

impl ZfsOps for ZfsCli {
    fn list_mountpoints(&self) -> Result<Vec<MountEntry>, ZfsError> {
        let stdout = self.run(&["list", "-H", "-o", "name,mountpoint"])?;
        Ok(parse_mount_entries(&stdout)?)
    }

    fn encryption_root(&self, dataset: &DatasetName) -> Result<Option<DatasetName>, ZfsError> {
        self.get_value("encryptionroot", dataset.as_str())?
            .map(DatasetName::new)
            .transpose()
            .map_err(ZfsError::from)
    }

    fn key_status(&self, root: &DatasetName) -> Result<KeyStatus, ZfsError> {
        let value = self.get_value("keystatus", root.as_str())?;
        Ok(value
            .map(|v| KeyStatus::parse(&v))
            .unwrap_or_else(|| KeyStatus::Other("-".to_string())))
    }

    fn create_snapshot(&self, spec: &SnapshotSpec) -> Result<(), ZfsError> {
        self.run(&["snapshot", &spec.to_string()]).map(|_| ())
    }

    fn snapshot_creation(&self, spec: &SnapshotSpec) -> Result<CreationTime, ZfsError> {
        let target = spec.to_string();
        let args = ["get", "-H", "-p", "-o", "value", "creation", target.as_str()];
        let stdout = self.run(&args)?;
        CreationTime::from_zfs_value(&stdout).map_err(|e| ZfsError::Parse {
            command: self.command_line(&args),
            message: e.to_string(),
        })
    }

    fn destroy_snapshot(&self, spec: &SnapshotSpec) -> Result<(), ZfsError> {
        self.run(&["destroy", &spec.to_string()]).map(|_| ())
    }

    fn list_snapshots(&self, dataset: &DatasetName) -> Result<Vec<SnapshotSpec>, ZfsError> {
        let stdout = self.run(&[
            "list",
            "-H",
            "-t",
            "snapshot",
            "-o",
            "name",
            "-d",
            "1",
            dataset.as_str(),
        ])?;
        stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| SnapshotSpec::parse(l).map_err(ZfsError::from))
            .collect()
    }

    fn version(&self) -> Result<Vec<String>, ZfsError> {
        let output = self.output(&["version"])?;
        let text = version_text(&output);
        if !output.status.success() {
            return Err(ZfsError::CommandFailed {
                command: self.command_line(&["version"]),
                code: output.status.code(),
                stderr: text,
            });
        }
        Ok(text.lines().map(str::to_string).collect())
    }
}

/// Stdout if non-empty, else stderr, trimmed.
pub(crate) fn version_text(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).trim().to_string()
    } else {
        stdout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_entries() {
        let out = "tank\t/mnt/tank\ntank/family\t/mnt/tank/family\ntank/vol\t-\n";
        let entries = parse_mount_entries(out).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].dataset.as_str(), "tank/family");
        assert_eq!(entries[1].mountpoint, "/mnt/tank/family");
        assert_eq!(entries[2].mountpoint, "-");
    }

    #[test]
    fn parse_entries_keeps_tabs_in_mountpoint() {
        let entries = parse_mount_entries("tank/x\t/mnt/odd\tname\n").unwrap();
        assert_eq!(entries[0].mountpoint, "/mnt/odd\tname");
    }

    #[test]
    fn parse_entries_skips_lines_without_tab() {
        let entries = parse_mount_entries("garbage\n\ntank\t/mnt/tank").unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn property_value_dash_is_none() {
        assert_eq!(property_value("-\n"), None);
        assert_eq!(property_value("\n"), None);
        assert_eq!(property_value("tank\n"), Some("tank".into()));
    }

    #[test]
    fn missing_binary_reported() {
        let zfs = ZfsCli::new("/nonexistent/definitely-not-zfs");
        assert!(matches!(
            zfs.list_mountpoints(),
            Err(ZfsError::NotInstalled { .. })
        ));
    }

    #[test]
    fn command_failed_message_names_exit() {
        let err = ZfsError::CommandFailed {
            command: "zfs snapshot tank@x".into(),
            code: Some(1),
            stderr: "dataset already exists".into(),
        };
        assert_eq!(
            err.to_string(),
            "'zfs snapshot tank@x' failed (exit 1): dataset already exists"
        );
    }
}
