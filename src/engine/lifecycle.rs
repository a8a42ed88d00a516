//! engine::lifecycle
//!
//! The snapshot lifecycle state machine.
//!
//! ```text
//! Start -> Resolved -> LockChecked -> Snapshotted -> BackupRan -> CleanedUp
//!   |         |             |                             |
//!   v         v             v                             v
//! ResolutionFailed        Locked        Aborted          RetainedForRetry
//! ```
//!
//! # Invariants
//!
//! - The lock check passes strictly before a snapshot is created
//! - Resolution and the lock check use only the registered mountpoint, so a
//!   locked (and therefore unmounted) dataset is reported as locked; the
//!   directory itself must exist only before snapshotting
//! - Exactly one snapshot name is generated per run
//! - `BackupRan` is always reached once a snapshot exists
//! - The snapshot is destroyed only after restic reported success; after a
//!   failure it is kept so the frozen view can be inspected or backed up
//!   again without re-snapshotting
//! - A failed destroy after a successful backup is reported but does not
//!   turn the run into a failure
//!
//! Cancellation is not handled: a run killed after `Snapshotted` leaves its
//! snapshot behind exactly like a failed backup. The next run warns about
//! such retained snapshots and then proceeds under a new name.

use std::fmt;

use crate::core::naming::NamingContext;
use crate::core::types::{MountPoint, SnapshotSpec};
use crate::restic::{BackupOutcome, BackupRequest, BackupRunner};
use crate::ui::output::{self, Verbosity};
use crate::zfs::ZfsOps;

use super::errors::LifecycleError;
use super::guard;
use super::resolve::{resolve, ResolvedDataset};
use super::snapshot::{SnapshotHandle, SnapshotManager};

/// States of one backup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Start,
    Resolved,
    LockChecked,
    Snapshotted,
    BackupRan,
    /// Backup succeeded; snapshot destroy attempted.
    CleanedUp,
    /// Backup failed; snapshot kept.
    RetainedForRetry,
    /// Not a dataset mountpoint.
    ResolutionFailed,
    /// Lock check did not pass.
    Locked,
    /// Mount point directory missing, or snapshot could not be created.
    Aborted,
}

impl LifecycleState {
    /// Whether the run ends in this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::CleanedUp
                | LifecycleState::RetainedForRetry
                | LifecycleState::ResolutionFailed
                | LifecycleState::Locked
                | LifecycleState::Aborted
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Start => "start",
            LifecycleState::Resolved => "resolved",
            LifecycleState::LockChecked => "lock-checked",
            LifecycleState::Snapshotted => "snapshotted",
            LifecycleState::BackupRan => "backup-ran",
            LifecycleState::CleanedUp => "cleaned-up",
            LifecycleState::RetainedForRetry => "retained-for-retry",
            LifecycleState::ResolutionFailed => "resolution-failed",
            LifecycleState::Locked => "locked",
            LifecycleState::Aborted => "aborted",
        };
        write!(f, "{}", name)
    }
}

/// Tunables of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Prefix of generated snapshot names
    pub prefix: String,
    /// Warn about snapshots retained by earlier runs
    pub warn_stale: bool,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            prefix: crate::core::naming::DEFAULT_PREFIX.to_string(),
            warn_stale: true,
        }
    }
}

/// Everything that happened in one run.
#[derive(Debug)]
pub struct LifecycleReport {
    /// States visited, in order, starting with `Start`
    pub trace: Vec<LifecycleState>,
    /// Resolution result, once `Resolved` was reached
    pub dataset: Option<ResolvedDataset>,
    /// Snapshots left by earlier runs
    pub stale: Vec<SnapshotSpec>,
    /// This run's snapshot, once `Snapshotted` was reached
    pub snapshot: Option<SnapshotHandle>,
    /// Restic result, once `BackupRan` was reached
    pub outcome: Option<BackupOutcome>,
    /// Fatal error for early terminal states
    pub error: Option<LifecycleError>,
    /// Destroy failure after a successful backup
    pub destroy_error: Option<LifecycleError>,
}

impl LifecycleReport {
    fn new() -> Self {
        Self {
            trace: vec![LifecycleState::Start],
            dataset: None,
            stale: Vec::new(),
            snapshot: None,
            outcome: None,
            error: None,
            destroy_error: None,
        }
    }

    /// Final state.
    pub fn state(&self) -> LifecycleState {
        self.trace
            .last()
            .copied()
            .unwrap_or(LifecycleState::Start)
    }

    /// Whether the backup succeeded.
    pub fn is_success(&self) -> bool {
        self.state() == LifecycleState::CleanedUp
    }

    /// The snapshot kept for inspection or retry, if any.
    pub fn retained_snapshot(&self) -> Option<&SnapshotSpec> {
        match self.state() {
            LifecycleState::RetainedForRetry => self.snapshot.as_ref().map(|h| &h.spec),
            _ => None,
        }
    }

    /// Process exit code: 0 on success, restic's code after a failed
    /// backup, 1 for every other failure.
    pub fn exit_code(&self) -> u8 {
        match self.state() {
            LifecycleState::CleanedUp => 0,
            LifecycleState::RetainedForRetry => self
                .outcome
                .as_ref()
                .map(BackupOutcome::failure_exit_code)
                .unwrap_or(1),
            _ => 1,
        }
    }
}

/// Runs the lifecycle against injected collaborators.
pub struct Lifecycle<'a> {
    zfs: &'a dyn ZfsOps,
    restic: &'a dyn BackupRunner,
    settings: LifecycleSettings,
    naming: NamingContext,
    verbosity: Verbosity,
}

impl<'a> Lifecycle<'a> {
    /// Create a lifecycle. `naming` fixes pid, host and clock for the
    /// snapshot name.
    pub fn new(
        zfs: &'a dyn ZfsOps,
        restic: &'a dyn BackupRunner,
        settings: LifecycleSettings,
        naming: NamingContext,
    ) -> Self {
        Self {
            zfs,
            restic,
            settings,
            naming,
            verbosity: Verbosity::Normal,
        }
    }

    /// Set output verbosity.
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    fn enter(&self, report: &mut LifecycleReport, state: LifecycleState) {
        output::debug(
            format_args!("state {} -> {}", report.state(), state),
            self.verbosity,
        );
        report.trace.push(state);
    }

    fn fail(
        &self,
        mut report: LifecycleReport,
        state: LifecycleState,
        error: LifecycleError,
    ) -> LifecycleReport {
        output::error(&error);
        self.enter(&mut report, state);
        report.error = Some(error);
        report
    }

    /// Run one backup of `mountpoint`, appending `passthrough` to the
    /// restic command line.
    pub fn run(&self, mountpoint: &MountPoint, passthrough: &[String]) -> LifecycleReport {
        let v = self.verbosity;
        let mut report = LifecycleReport::new();

        // Start -> Resolved
        output::print("Checking ZFS dataset is unlocked...", v);
        let target = match resolve(self.zfs, mountpoint) {
            Ok(target) => target,
            Err(e) => return self.fail(report, LifecycleState::ResolutionFailed, e),
        };
        output::debug(
            format_args!("{} is dataset {}", mountpoint, target.dataset),
            v,
        );
        report.dataset = Some(target.clone());
        self.enter(&mut report, LifecycleState::Resolved);

        // Resolved -> LockChecked
        match guard::check(self.zfs, target.encryption_root.as_ref()) {
            Ok(guard::LockState::NotEncrypted) => output::print(
                format_args!("  OK: {} ({}) not encrypted", mountpoint, target.dataset),
                v,
            ),
            Ok(state) => output::print(format_args!("  OK: {} {}", mountpoint, state), v),
            Err(e) => return self.fail(report, LifecycleState::Locked, e),
        }
        self.enter(&mut report, LifecycleState::LockChecked);

        let manager = SnapshotManager::new(self.zfs, self.settings.prefix.clone());
        if self.settings.warn_stale {
            report.stale = self.stale_snapshots(&manager, &target);
        }

        // LockChecked -> Snapshotted
        if !mountpoint.as_path().is_dir() {
            let error = LifecycleError::SourceNotFound {
                path: mountpoint.as_path().to_path_buf(),
            };
            return self.fail(report, LifecycleState::Aborted, error);
        }
        output::print("Creating ZFS snapshot...", v);
        let handle = match manager.create(&target, &self.naming) {
            Ok(handle) => handle,
            Err(e) => return self.fail(report, LifecycleState::Aborted, e),
        };
        output::print(format_args!("  Created {}", handle.spec), v);
        output::debug(
            format_args!(
                "snapshot view {}, created {}",
                handle.path.display(),
                handle.created
            ),
            v,
        );
        report.snapshot = Some(handle.clone());
        self.enter(&mut report, LifecycleState::Snapshotted);

        // Snapshotted -> BackupRan
        output::print("Running restic backup...", v);
        let request = BackupRequest {
            workdir: handle.path.clone(),
            time: handle.created.restic_format(),
            passthrough: passthrough.to_vec(),
        };
        output::print(
            format_args!("  {}", self.restic.command_line(&request)),
            v,
        );
        let outcome = self.restic.run_backup(&request);
        report.outcome = Some(outcome.clone());
        self.enter(&mut report, LifecycleState::BackupRan);

        // BackupRan -> RetainedForRetry
        if !outcome.is_success() {
            if outcome.exit_code.is_none() {
                output::error(outcome.output.trim());
            }
            output::error(format_args!(
                "restic backup {} - snapshot left in place for inspection or retry: {}",
                outcome, handle.spec
            ));
            self.enter(&mut report, LifecycleState::RetainedForRetry);
            return report;
        }

        // BackupRan -> CleanedUp
        output::print("Destroying ZFS snapshot...", v);
        if let Err(e) = manager.destroy(&handle.spec) {
            output::warn(&e, v);
            report.destroy_error = Some(e);
        }
        self.enter(&mut report, LifecycleState::CleanedUp);
        output::success(format_args!("backup of {} complete", mountpoint), v);
        report
    }

    /// List and report snapshots retained by earlier runs. Never fatal.
    fn stale_snapshots(
        &self,
        manager: &SnapshotManager<'_>,
        target: &ResolvedDataset,
    ) -> Vec<SnapshotSpec> {
        match manager.retained(&target.dataset) {
            Ok(stale) => {
                if !stale.is_empty() {
                    output::warn(
                        format_args!(
                            "{} snapshot(s) retained from previous failed or interrupted runs \
                             (not removed automatically):\n{}",
                            stale.len(),
                            output::format_list(&stale, "  - ")
                        ),
                        self.verbosity,
                    );
                }
                stale
            }
            Err(e) => {
                output::warn(
                    format_args!("could not list existing snapshots of {}: {}", target.dataset, e),
                    self.verbosity,
                );
                Vec::new()
            }
        }
    }
}
