//! Integration tests for both binaries.
//!
//! These tests run the built executables against fake `zfs` and `restic`
//! shell scripts. The fake zfs knows two datasets, `tank` on `/mnt/tank` and
//! `tank/family` on a temp directory, and keeps snapshots as directories
//! under `<mount>/.zfs/snapshot`. Environment variables steer it:
//!
//! - `FAKE_ZFS_MOUNT`: mountpoint of `tank/family`
//! - `FAKE_ZFS_ENCROOT`: encryption root of `tank/family` (default `-`)
//! - `FAKE_ZFS_KEYSTATUS`: key status of that root (default `available`)
//! - `FAKE_ZFS_DESTROY_FAIL`: make `zfs destroy` fail
//! - `FAKE_RESTIC_EXIT`: exit code of `restic backup` (default 0)

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Fixtures
// =============================================================================

const FAKE_ZFS: &str = r#"#!/bin/sh
last=""
prop=""
for a in "$@"; do prop="$last"; last="$a"; done
case "$1" in
  version)
    echo "zfs-2.2.2-1"
    echo "zfs-kmod-2.2.2-1"
    ;;
  list)
    if [ "$3" = "-t" ]; then
      ls "$FAKE_ZFS_MOUNT/.zfs/snapshot" 2>/dev/null | sed "s|^|tank/family@|"
    else
      printf 'tank\t/mnt/tank\ntank/family\t%s\n' "$FAKE_ZFS_MOUNT"
    fi
    ;;
  get)
    case "$prop" in
      encryptionroot) echo "${FAKE_ZFS_ENCROOT:--}" ;;
      keystatus) echo "${FAKE_ZFS_KEYSTATUS:-available}" ;;
      creation) echo 1705284000 ;;
      *) echo "bad property $prop" >&2; exit 1 ;;
    esac
    ;;
  snapshot)
    dir="$FAKE_ZFS_MOUNT/.zfs/snapshot/${2#*@}"
    if [ -e "$dir" ]; then echo "cannot create snapshot '$2': dataset already exists" >&2; exit 1; fi
    mkdir -p "$dir"
    ;;
  destroy)
    if [ -n "$FAKE_ZFS_DESTROY_FAIL" ]; then echo "cannot destroy '$2': dataset is busy" >&2; exit 1; fi
    rmdir "$FAKE_ZFS_MOUNT/.zfs/snapshot/${2#*@}"
    ;;
  *)
    echo "unsupported: $*" >&2
    exit 2
    ;;
esac
"#;

const FAKE_RESTIC: &str = r#"#!/bin/sh
case "$1" in
  version) echo "restic 0.16.4 compiled with go1.21.6 on linux/amd64" ;;
  backup)
    echo "cwd=$(pwd)"
    echo "args=$*"
    echo "warning from restic" >&2
    exit "${FAKE_RESTIC_EXIT:-0}"
    ;;
esac
"#;

/// Temp environment with fake tools, an empty config and a mount point.
struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        write_script(&dir.path().join("zfs"), FAKE_ZFS);
        write_script(&dir.path().join("restic"), FAKE_RESTIC);
        fs::write(dir.path().join("config.toml"), "").unwrap();
        fs::create_dir(dir.path().join("family")).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn mount(&self) -> PathBuf {
        self.path("family")
    }

    fn snapshots(&self) -> Vec<String> {
        match fs::read_dir(self.mount().join(".zfs/snapshot")) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn command(&self, bin: &str) -> Command {
        let mut cmd = Command::cargo_bin(bin).unwrap();
        cmd.env("ZFS_RESTIC_CONFIG", self.path("config.toml"))
            .env("FAKE_ZFS_MOUNT", self.mount())
            .env_remove("FAKE_ZFS_ENCROOT")
            .env_remove("FAKE_ZFS_KEYSTATUS")
            .env_remove("FAKE_ZFS_DESTROY_FAIL")
            .env_remove("FAKE_RESTIC_EXIT")
            .arg("--zfs-bin")
            .arg(self.path("zfs"));
        cmd
    }

    /// `zfs-restic-backup` with the fake tools, backing up the mount.
    fn backup(&self) -> Command {
        let mut cmd = self.command("zfs-restic-backup");
        cmd.arg("--restic-bin").arg(self.path("restic"));
        cmd
    }

    fn check(&self) -> Command {
        self.command("zfs-check-unlocked")
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

// =============================================================================
// zfs-restic-backup
// =============================================================================

#[test]
fn help_flag_works() {
    Command::cargo_bin("zfs-restic-backup")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MOUNT_POINT"))
        .stdout(predicate::str::contains("--restic-bin"));
}

#[test]
fn missing_mount_point_is_usage_error() {
    Command::cargo_bin("zfs-restic-backup")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("MOUNT_POINT"));
}

#[test]
fn successful_backup_destroys_snapshot() {
    let env = Env::new();
    let view = env.mount().join(".zfs/snapshot/zfs-restic-");

    env.backup()
        .arg(env.mount())
        .args(["--", "--tag", "nightly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  zfs: zfs-2.2.2-1"))
        .stdout(predicate::str::contains("  restic: restic 0.16.4"))
        .stdout(predicate::str::contains("Created tank/family@zfs-restic-"))
        .stdout(predicate::str::contains(format!("cwd={}", view.display())))
        .stdout(predicate::str::contains("args=backup --time "))
        .stdout(predicate::str::contains(". --tag nightly"))
        .stdout(predicate::str::contains("warning from restic"));

    assert!(env.snapshots().is_empty());
}

#[test]
fn failed_backup_keeps_snapshot_and_exit_code() {
    let env = Env::new();

    env.backup()
        .env("FAKE_RESTIC_EXIT", "3")
        .arg(env.mount())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("left in place"))
        .stderr(predicate::str::contains("tank/family@zfs-restic-"));

    let snapshots = env.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].starts_with("zfs-restic-"));
}

#[test]
fn locked_dataset_is_never_snapshotted() {
    let env = Env::new();

    env.backup()
        .env("FAKE_ZFS_ENCROOT", "tank")
        .env("FAKE_ZFS_KEYSTATUS", "unavailable")
        .arg(env.mount())
        .assert()
        .failure()
        .stderr(predicate::str::contains("tank is LOCKED"));

    assert!(!env.mount().join(".zfs").exists());
}

#[test]
fn padded_mount_point_is_trimmed() {
    let env = Env::new();

    env.backup()
        .arg(format!("  {} \n", env.mount().display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Created tank/family@zfs-restic-"));

    assert!(env.snapshots().is_empty());
}

#[test]
fn debug_logs_resolved_binaries() {
    let env = Env::new();

    env.backup()
        .arg("--debug")
        .arg(env.mount())
        .assert()
        .success()
        .stderr(predicate::str::contains(format!(
            "[debug] zfs binary: {}",
            env.path("zfs").display()
        )))
        .stderr(predicate::str::contains(format!(
            "[debug] restic binary: {}",
            env.path("restic").canonicalize().unwrap().display()
        )));
}

#[test]
fn unknown_mount_point_fails() {
    let env = Env::new();
    let other = env.path("other");
    fs::create_dir(&other).unwrap();

    env.backup()
        .arg(&other)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no ZFS dataset with mountpoint"));
}

#[test]
fn unmounted_source_path_fails_before_snapshot() {
    let env = Env::new();
    let missing = env.path("missing");

    env.backup()
        .env("FAKE_ZFS_MOUNT", &missing)
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains(format!(
            "path {} not found",
            missing.display()
        )));

    assert!(!missing.exists());
}

#[test]
fn locked_unmounted_dataset_names_root() {
    let env = Env::new();
    let missing = env.path("missing");

    env.backup()
        .env("FAKE_ZFS_MOUNT", &missing)
        .env("FAKE_ZFS_ENCROOT", "tank")
        .env("FAKE_ZFS_KEYSTATUS", "unavailable")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("tank is LOCKED"))
        .stderr(predicate::str::contains("not found").not());
}

#[test]
fn destroy_failure_is_warning_only() {
    let env = Env::new();

    env.backup()
        .env("FAKE_ZFS_DESTROY_FAIL", "1")
        .arg(env.mount())
        .assert()
        .success()
        .stderr(predicate::str::contains("remove it manually"));

    assert_eq!(env.snapshots().len(), 1);
}

#[test]
fn stale_snapshot_warned_not_removed() {
    let env = Env::new();
    let stale = env.mount().join(".zfs/snapshot/zfs-restic-1-old-20240101-000000");
    fs::create_dir_all(&stale).unwrap();

    env.backup()
        .arg(env.mount())
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "tank/family@zfs-restic-1-old-20240101-000000",
        ));

    assert!(stale.is_dir());
}

#[test]
fn restic_bin_must_be_executable() {
    let env = Env::new();
    let plain = env.path("not-exec");
    fs::write(&plain, "").unwrap();

    env.command("zfs-restic-backup")
        .arg("--restic-bin")
        .arg(&plain)
        .arg(env.mount())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not executable"));
}

#[test]
fn missing_zfs_fails_prerequisites() {
    let env = Env::new();

    Command::cargo_bin("zfs-restic-backup")
        .unwrap()
        .env("ZFS_RESTIC_CONFIG", env.path("config.toml"))
        .arg("--zfs-bin")
        .arg(env.path("no-such-zfs"))
        .arg("--restic-bin")
        .arg(env.path("restic"))
        .arg(env.mount())
        .assert()
        .failure()
        .stderr(predicate::str::contains("zfs not available"));

    assert!(!env.mount().join(".zfs").exists());
}

#[test]
fn quiet_suppresses_progress() {
    let env = Env::new();

    env.backup()
        .arg("--quiet")
        .arg(env.mount())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// =============================================================================
// zfs-check-unlocked
// =============================================================================

#[test]
fn check_requires_a_path() {
    Command::cargo_bin("zfs-check-unlocked")
        .unwrap()
        .assert()
        .failure();
}

#[test]
fn check_unencrypted_passes() {
    let env = Env::new();
    env.check()
        .arg(env.mount())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn check_unlocked_passes_and_skips_blank_args() {
    let env = Env::new();
    env.check()
        .env("FAKE_ZFS_ENCROOT", "tank")
        .arg("  ")
        .arg(env.mount())
        .assert()
        .success();
}

#[test]
fn check_locked_fails_with_message() {
    let env = Env::new();
    env.check()
        .env("FAKE_ZFS_ENCROOT", "tank")
        .env("FAKE_ZFS_KEYSTATUS", "unavailable")
        .arg(env.mount())
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!(
            "Dataset is LOCKED: {} (encryption root tank) - unlock the dataset first",
            env.mount().display()
        )));
}

#[test]
fn check_reports_each_failing_path() {
    let env = Env::new();
    env.check()
        .arg("/mnt/tank")
        .arg("/mnt/nowhere")
        .arg(env.mount())
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "No ZFS dataset with mountpoint: /mnt/nowhere",
        ))
        .stderr(predicate::str::contains("/mnt/tank\n").not());
}

#[test]
fn check_unexpected_keystatus() {
    let env = Env::new();
    env.check()
        .env("FAKE_ZFS_ENCROOT", "tank")
        .env("FAKE_ZFS_KEYSTATUS", "-")
        .arg(env.mount())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unexpected keystatus '-' for tank"));
}
