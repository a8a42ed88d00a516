//! zfs-restic - ZFS snapshot lifecycle around restic backups
//!
//! Backs up a ZFS dataset from a point-in-time snapshot instead of the live
//! filesystem: check the dataset is unlocked, snapshot it, run restic inside
//! the snapshot's read-only view with the snapshot's creation time, then
//! destroy the snapshot on success or keep it for retry on failure.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Resolve → Lock check → Snapshot → Backup → Cleanup
//! - [`core`] - Domain types, naming, paths and configuration
//! - [`zfs`] - Single interface for all ZFS operations
//! - [`restic`] - Single interface for running restic
//! - [`ui`] - Timestamped output
//!
//! # Correctness Invariants
//!
//! 1. No snapshot is created for a dataset whose encryption key is not loaded
//! 2. restic only ever reads the frozen snapshot view
//! 3. A snapshot is destroyed only after restic reported success
//! 4. Every run uses a fresh, unique snapshot name

pub mod cli;
pub mod core;
pub mod engine;
pub mod restic;
pub mod ui;
pub mod zfs;
