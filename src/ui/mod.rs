//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Timestamped, verbosity-aware log lines
//!
//! # Design
//!
//! All output goes through this module so scheduled runs produce a
//! consistent, greppable log.

pub mod output;
