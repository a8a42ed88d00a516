//! cli
//!
//! Command-line interface layer for both binaries.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments
//! - Delegate to command handlers
//! - Turn setup errors into a logged message and exit code 1
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution. All zfs and restic calls flow through the
//! engine's capability traits.

pub mod args;
pub mod commands;

pub use args::{BackupCli, CheckCli};

use std::process::ExitCode;

use anyhow::Result;

use crate::engine;
use crate::ui::output;

/// Entry point of `zfs-restic-backup`.
pub fn run_backup() -> ExitCode {
    let cli = BackupCli::parse_args();
    let ctx = engine::Context {
        cwd: None,
        debug: cli.debug,
        quiet: cli.quiet,
    };
    finish(commands::backup(cli, &ctx), |e| output::error(format_args!("{:#}", e)))
}

/// Entry point of `zfs-check-unlocked`.
pub fn run_check() -> ExitCode {
    let cli = CheckCli::parse_args();
    let ctx = engine::Context::default();
    finish(commands::check(cli, &ctx), |e| output::diagnostic(format_args!("{:#}", e)))
}

fn finish(result: Result<ExitCode>, report: impl FnOnce(&anyhow::Error)) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}
