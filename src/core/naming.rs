//! core::naming
//!
//! Snapshot naming rules.
//!
//! # Format
//!
//! `<prefix>-<pid>-<hostname>-<YYYYmmdd-HHMMSS>` with the timestamp in UTC.
//! The pid, host and second-resolution clock together keep concurrent runs
//! on the same or different hosts from colliding in a dataset's snapshot
//! namespace.
//!
//! # Injection
//!
//! Process id, hostname and clock are captured once in a [`NamingContext`]
//! and passed in explicitly, so generation is deterministic under test.

use chrono::{DateTime, Utc};

use crate::core::types::{SnapshotName, TypeError};

/// Default snapshot prefix.
pub const DEFAULT_PREFIX: &str = "zfs-restic";

/// Inputs for snapshot name generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingContext {
    /// Process id of this invocation.
    pub pid: u32,
    /// Sanitized host name.
    pub hostname: String,
    /// Wall-clock time at invocation start.
    pub now: DateTime<Utc>,
}

impl NamingContext {
    /// Build a context with an already sanitized hostname.
    pub fn new(pid: u32, hostname: &str, now: DateTime<Utc>) -> Self {
        Self {
            pid,
            hostname: sanitize_hostname(hostname),
            now,
        }
    }

    /// Capture pid, hostname and clock of the running process.
    pub fn current() -> Self {
        Self::new(std::process::id(), &system_hostname(), Utc::now())
    }
}

/// Generate a snapshot name.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use zfs_restic::core::naming::{snapshot_name, NamingContext};
///
/// let ctx = NamingContext::new(4821, "hostA", Utc.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap());
/// let name = snapshot_name("zfs-restic", &ctx).unwrap();
/// assert_eq!(name.as_str(), "zfs-restic-4821-hostA-20240115-020000");
/// ```
pub fn snapshot_name(prefix: &str, ctx: &NamingContext) -> Result<SnapshotName, TypeError> {
    SnapshotName::new(format!(
        "{}-{}-{}-{}",
        prefix,
        ctx.pid,
        ctx.hostname,
        ctx.now.format("%Y%m%d-%H%M%S")
    ))
}

/// Whether a snapshot name was produced by this tool with `prefix`.
pub fn is_managed(name: &SnapshotName, prefix: &str) -> bool {
    name.as_str()
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('-'))
}

/// Make a host name safe for use inside a snapshot name.
///
/// Every character outside `[A-Za-z0-9-]` becomes `-`, leading and trailing
/// dashes are trimmed, and an empty result falls back to `host`.
///
/// ```
/// use zfs_restic::core::naming::sanitize_hostname;
///
/// assert_eq!(sanitize_hostname("nas.local"), "nas-local");
/// assert_eq!(sanitize_hostname("..."), "host");
/// ```
pub fn sanitize_hostname(raw: &str) -> String {
    let replaced: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    let trimmed = replaced.trim_matches('-');
    if trimmed.is_empty() {
        "host".to_string()
    } else {
        trimmed.to_string()
    }
}

/// The kernel node name, as `uname` reports it.
fn system_hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .map(|name| name.to_string_lossy().trim().to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_default()
}
