//! cli::commands
//!
//! Command handlers.
//!
//! # Architecture
//!
//! Each handler:
//! 1. Loads configuration and builds the real collaborators
//! 2. Calls the engine
//! 3. Maps the result to a process exit code
//!
//! Handlers do NOT run zfs or restic directly.

mod backup;
mod check;

pub use backup::backup;
pub use check::{check, check_path};

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::engine::Context;
use crate::ui::output;

/// Load configuration, logging where it came from.
fn load_config(explicit: Option<&std::path::Path>, ctx: &Context) -> Result<Config> {
    let config = Config::load(explicit).context("failed to load configuration")?;
    match config.loaded_from() {
        Some(path) => output::debug(
            format_args!("config loaded from {}", path.display()),
            ctx.verbosity(),
        ),
        None => output::debug("no config file found, using defaults", ctx.verbosity()),
    }
    Ok(config)
}

/// The zfs binary: flag, else config.
fn zfs_bin(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(config.zfs_bin()))
}
