//! core
//!
//! Core domain types and rules.
//!
//! # Modules
//!
//! - [`types`] - Strong types: MountPoint, DatasetName, SnapshotSpec, etc.
//! - [`naming`] - Snapshot naming rules
//! - [`paths`] - Snapshot view paths under `.zfs/snapshot`
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Nothing here runs external commands
//! - Naming is deterministic given its inputs

pub mod config;
pub mod naming;
pub mod paths;
pub mod types;
