//! restic
//!
//! Abstraction over the backup tool.
//!
//! # Architecture
//!
//! The engine only needs "run a backup from this directory with this
//! timestamp and these extra arguments, and tell me how it went". That is
//! the [`BackupRunner`] trait. Repository management, passwords and
//! retention stay entirely with restic and its environment
//! (`RESTIC_REPOSITORY`, `RESTIC_PASSWORD_FILE`, ...), which is inherited.
//!
//! # Invariants
//!
//! - A non-zero restic exit is an outcome, never an error
//! - Passthrough arguments are appended verbatim and never interpreted

pub mod mock;
mod runner;

pub use runner::{BackupOutcome, BackupRequest, BackupRunner, Restic, ResticError};
