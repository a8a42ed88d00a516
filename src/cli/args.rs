//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Flags
//!
//! Both binaries accept:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--zfs-bin <path>`: zfs binary to use
//!
//! The backup binary additionally takes `--restic-bin`, `--config`,
//! `--debug` and `--quiet`, a mount point, and restic arguments after `--`.

use clap::Parser;
use std::path::PathBuf;

/// Snapshot a ZFS dataset and back up the frozen view with restic
#[derive(Parser, Debug)]
#[command(name = "zfs-restic-backup")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
EXAMPLES:
    # Nightly backup of one dataset
    zfs-restic-backup /mnt/tank/family -- --tag nightly

    # Dry run with an explicit restic binary
    zfs-restic-backup --restic-bin /usr/local/bin/restic /mnt/tank/family -- --dry-run

restic reads its repository and password from the usual RESTIC_* environment
variables. On failure the snapshot is kept and its name is logged for retry.")]
pub struct BackupCli {
    /// Mount point of the dataset to back up
    #[arg(value_name = "MOUNT_POINT")]
    pub mount_point: String,

    /// Arguments passed verbatim to `restic backup`
    #[arg(last = true, value_name = "RESTIC_ARGS")]
    pub restic_args: Vec<String>,

    /// Path to the restic binary (must be an executable file)
    #[arg(long, value_name = "PATH")]
    pub restic_bin: Option<PathBuf>,

    /// Path or name of the zfs binary
    #[arg(long, value_name = "PATH")]
    pub zfs_bin: Option<PathBuf>,

    /// Configuration file to use instead of the search path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Errors only
    #[arg(short, long)]
    pub quiet: bool,
}

impl BackupCli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Check that the ZFS datasets mounted at the given paths are unlocked
#[derive(Parser, Debug)]
#[command(name = "zfs-check-unlocked")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
Exits 0 if every path is the mountpoint of a dataset that is unencrypted or
whose encryption root has its key loaded. Exits 1 otherwise, with one line
per failing path on stderr.")]
pub struct CheckCli {
    /// Mount points to check
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<String>,

    /// Path or name of the zfs binary
    #[arg(long, value_name = "PATH")]
    pub zfs_bin: Option<PathBuf>,
}

impl CheckCli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}
