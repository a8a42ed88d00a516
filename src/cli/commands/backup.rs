//! backup command - snapshot, back up, clean up

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use super::{load_config, zfs_bin};
use crate::cli::args::BackupCli;
use crate::core::naming::NamingContext;
use crate::core::types::MountPoint;
use crate::engine::{prereq, Context, Lifecycle, LifecycleSettings};
use crate::restic::Restic;
use crate::ui::output::{self, Verbosity};
use crate::zfs::ZfsCli;

/// Run one backup.
///
/// Setup failures (config, binaries, prerequisites) are returned as errors;
/// once the lifecycle starts its report decides the exit code.
pub fn backup(cli: BackupCli, ctx: &Context) -> Result<ExitCode> {
    let v = ctx.verbosity();
    let config = load_config(cli.config.as_deref(), ctx)?;

    let restic_bin = match &cli.restic_bin {
        Some(path) => prereq::validate_executable(path).context("invalid --restic-bin")?,
        None => PathBuf::from(config.restic_bin()),
    };
    let zfs = ZfsCli::new(zfs_bin(cli.zfs_bin.clone(), &config));
    let restic = Restic::new(restic_bin).echo(v != Verbosity::Quiet);

    if config.log_binary_digest() {
        match prereq::binary_digest() {
            Some((name, digest)) => output::print(format_args!("  {}: sha256:{}", name, digest), v),
            None => output::print("  (unable to read own binary)", v),
        }
    }

    output::debug(format_args!("zfs binary: {}", zfs.bin().display()), v);
    output::debug(format_args!("restic binary: {}", restic.bin().display()), v);

    let versions = prereq::verify(&zfs, &restic)?;
    for line in &versions.zfs {
        output::print(format_args!("  zfs: {}", line), v);
    }
    for line in &versions.restic {
        output::print(format_args!("  restic: {}", line), v);
    }

    let base = ctx.base_dir().context("cannot determine current directory")?;
    let mountpoint = MountPoint::resolve(cli.mount_point.trim(), &base)?;

    let settings = LifecycleSettings {
        prefix: config.snapshot_prefix().to_string(),
        warn_stale: config.warn_stale_snapshots(),
    };
    let report = Lifecycle::new(&zfs, &restic, settings, NamingContext::current())
        .verbosity(v)
        .run(&mountpoint, &cli.restic_args);

    let trace: Vec<String> = report.trace.iter().map(ToString::to_string).collect();
    output::debug(format_args!("states: {}", trace.join(" -> ")), v);
    Ok(ExitCode::from(report.exit_code()))
}
