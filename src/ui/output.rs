//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Runs are usually unattended, so every line the orchestrator emits carries
//! a local timestamp: `[2024-01-15T02:00:00.123456] message`. Errors are
//! always shown; everything else respects the quiet flag.

use std::fmt::Display;

use chrono::{DateTime, Local};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - errors only
    Quiet,
    /// Normal mode - progress and warnings
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Prefix a message with a timestamp.
pub fn stamp(at: DateTime<Local>, message: impl Display) -> String {
    format!("[{}] {}", at.format("%Y-%m-%dT%H:%M:%S%.6f"), message)
}

fn now_stamp(message: impl Display) -> String {
    stamp(Local::now(), message)
}

/// Print a progress message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", now_stamp(message));
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("{}", now_stamp(format_args!("[debug] {}", message)));
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("{}", now_stamp(format_args!("ERROR: {}", message)));
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("{}", now_stamp(format_args!("WARNING: {}", message)));
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", now_stamp(format_args!("OK: {}", message)));
    }
}

/// Print an unstamped diagnostic line to stderr (always shown).
///
/// Used by the lock-check tool, whose output is consumed by shell scripts.
pub fn diagnostic(message: impl Display) {
    eprintln!("{}", message);
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn stamp_format() {
        let at = Local.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap();
        assert_eq!(stamp(at, "Done."), "[2024-01-15T02:00:00.000000] Done.");
    }

    #[test]
    fn list_format() {
        assert_eq!(format_list(&["a", "b"], "  - "), "  - a\n  - b");
    }
}
