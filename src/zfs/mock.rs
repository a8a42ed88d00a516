//! zfs::mock
//!
//! Mock ZFS implementation for deterministic testing.
//!
//! # Design
//!
//! `MockZfs` keeps a dataset registry and a snapshot table in memory,
//! records every call, and can be told to fail a specific operation. When a
//! dataset's mountpoint is an existing directory, snapshot creation also
//! materializes `<mountpoint>/.zfs/snapshot/<name>` and destruction removes
//! it, mirroring what the kernel exposes.
//!
//! # Example
//!
//! ```
//! use zfs_restic::core::types::{DatasetName, SnapshotName, SnapshotSpec};
//! use zfs_restic::zfs::mock::{MockOperation, MockZfs};
//! use zfs_restic::zfs::ZfsOps;
//!
//! let zfs = MockZfs::new().with_dataset("tank/family", "/mnt/tank/family");
//! let spec = SnapshotSpec::new(
//!     DatasetName::new("tank/family").unwrap(),
//!     SnapshotName::new("s1").unwrap(),
//! );
//!
//! zfs.create_snapshot(&spec).unwrap();
//! assert!(zfs.has_snapshot(&spec));
//! assert!(zfs.create_snapshot(&spec).is_err());
//! assert_eq!(zfs.count(|op| matches!(op, MockOperation::CreateSnapshot(_))), 2);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::interface::{MountEntry, ZfsError, ZfsOps};
use crate::core::paths::snapshot_dir;
use crate::core::types::{CreationTime, DatasetName, KeyStatus, MountPoint, SnapshotSpec};

/// Creation time assigned to new snapshots unless overridden
/// (2024-01-15T02:00:00Z).
pub const DEFAULT_CREATION_EPOCH: i64 = 1_705_284_000;

/// Mock ZFS for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockZfs {
    inner: Arc<Mutex<MockZfsInner>>,
}

#[derive(Debug)]
struct MockZfsInner {
    datasets: Vec<MountEntry>,
    encryption_roots: HashMap<DatasetName, DatasetName>,
    key_status: HashMap<DatasetName, KeyStatus>,
    snapshots: BTreeMap<SnapshotSpec, CreationTime>,
    creation_epoch: i64,
    materialize_dirs: bool,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

/// Which operation should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOn {
    ListMountpoints,
    EncryptionRoot,
    KeyStatus,
    CreateSnapshot,
    SnapshotCreation,
    DestroySnapshot,
    ListSnapshots,
    Version,
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ListMountpoints,
    EncryptionRoot(DatasetName),
    KeyStatus(DatasetName),
    CreateSnapshot(SnapshotSpec),
    SnapshotCreation(SnapshotSpec),
    DestroySnapshot(SnapshotSpec),
    ListSnapshots(DatasetName),
    Version,
}

fn dataset(name: &str) -> DatasetName {
    DatasetName::new(name).expect("mock dataset name must be valid")
}

impl Default for MockZfs {
    fn default() -> Self {
        Self::new()
    }
}

impl MockZfs {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockZfsInner {
                datasets: Vec::new(),
                encryption_roots: HashMap::new(),
                key_status: HashMap::new(),
                snapshots: BTreeMap::new(),
                creation_epoch: DEFAULT_CREATION_EPOCH,
                materialize_dirs: true,
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockZfsInner> {
        self.inner.lock().unwrap()
    }

    /// Register a dataset with its mountpoint property.
    pub fn with_dataset(self, name: &str, mountpoint: impl AsRef<Path>) -> Self {
        self.lock().datasets.push(MountEntry {
            dataset: dataset(name),
            mountpoint: mountpoint.as_ref().display().to_string(),
        });
        self
    }

    /// Mark `name` as encrypted under `root` (which may equal `name`).
    pub fn with_encryption_root(self, name: &str, root: &str) -> Self {
        self.lock()
            .encryption_roots
            .insert(dataset(name), dataset(root));
        self
    }

    /// Set the key status of an encryption root.
    pub fn with_key_status(self, root: &str, status: KeyStatus) -> Self {
        self.lock().key_status.insert(dataset(root), status);
        self
    }

    /// Pre-populate an existing snapshot.
    pub fn with_snapshot(self, spec: &str) -> Self {
        {
            let mut inner = self.lock();
            let spec = SnapshotSpec::parse(spec).expect("mock snapshot spec must be valid");
            let created = CreationTime::from_epoch_seconds(inner.creation_epoch)
                .expect("mock creation epoch must be valid");
            inner.snapshots.insert(spec, created);
        }
        self
    }

    /// Creation time recorded for snapshots created from now on.
    pub fn with_creation_epoch(self, epoch: i64) -> Self {
        self.lock().creation_epoch = epoch;
        self
    }

    /// Do not create snapshot directories under mountpoints.
    pub fn without_snapshot_dirs(self) -> Self {
        self.lock().materialize_dirs = false;
        self
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Count recorded operations matching `pred`.
    pub fn count(&self, pred: impl Fn(&MockOperation) -> bool) -> usize {
        self.lock().operations.iter().filter(|op| pred(op)).count()
    }

    /// Whether a snapshot currently exists.
    pub fn has_snapshot(&self, spec: &SnapshotSpec) -> bool {
        self.lock().snapshots.contains_key(spec)
    }

    /// All existing snapshots.
    pub fn snapshots(&self) -> Vec<SnapshotSpec> {
        self.lock().snapshots.keys().cloned().collect()
    }

    fn record(&self, op: MockOperation, fail: FailOn) -> Result<(), ZfsError> {
        let mut inner = self.lock();
        let command = format!("{:?}", op);
        inner.operations.push(op);
        if inner.fail_on.as_ref() == Some(&fail) {
            return Err(ZfsError::CommandFailed {
                command,
                code: Some(1),
                stderr: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    /// Existing directory view for `spec`, if its dataset is mounted on one.
    fn view_dir(inner: &MockZfsInner, spec: &SnapshotSpec) -> Option<std::path::PathBuf> {
        if !inner.materialize_dirs {
            return None;
        }
        let entry = inner.datasets.iter().find(|e| &e.dataset == spec.dataset())?;
        let mountpoint = MountPoint::new(&entry.mountpoint).ok()?;
        if !mountpoint.as_path().is_dir() {
            return None;
        }
        Some(snapshot_dir(&mountpoint, spec.name()))
    }
}

fn io_failure(command: String, err: std::io::Error) -> ZfsError {
    ZfsError::CommandFailed {
        command,
        code: Some(1),
        stderr: err.to_string(),
    }
}

impl ZfsOps for MockZfs {
    fn list_mountpoints(&self) -> Result<Vec<MountEntry>, ZfsError> {
        self.record(MockOperation::ListMountpoints, FailOn::ListMountpoints)?;
        Ok(self.lock().datasets.clone())
    }

    fn encryption_root(&self, dataset: &DatasetName) -> Result<Option<DatasetName>, ZfsError> {
        self.record(
            MockOperation::EncryptionRoot(dataset.clone()),
            FailOn::EncryptionRoot,
        )?;
        Ok(self.lock().encryption_roots.get(dataset).cloned())
    }

    fn key_status(&self, root: &DatasetName) -> Result<KeyStatus, ZfsError> {
        self.record(MockOperation::KeyStatus(root.clone()), FailOn::KeyStatus)?;
        Ok(self
            .lock()
            .key_status
            .get(root)
            .cloned()
            .unwrap_or_else(|| KeyStatus::Other("-".to_string())))
    }

    fn create_snapshot(&self, spec: &SnapshotSpec) -> Result<(), ZfsError> {
        self.record(
            MockOperation::CreateSnapshot(spec.clone()),
            FailOn::CreateSnapshot,
        )?;
        let mut inner = self.lock();
        if inner.snapshots.contains_key(spec) {
            return Err(ZfsError::CommandFailed {
                command: format!("zfs snapshot {}", spec),
                code: Some(1),
                stderr: format!("cannot create snapshot '{}': dataset already exists", spec),
            });
        }
        if !inner.datasets.iter().any(|e| &e.dataset == spec.dataset()) {
            return Err(ZfsError::CommandFailed {
                command: format!("zfs snapshot {}", spec),
                code: Some(1),
                stderr: format!("cannot open '{}': dataset does not exist", spec.dataset()),
            });
        }
        if let Some(dir) = Self::view_dir(&inner, spec) {
            fs::create_dir_all(&dir).map_err(|e| io_failure(format!("zfs snapshot {}", spec), e))?;
        }
        let created = CreationTime::from_epoch_seconds(inner.creation_epoch)?;
        inner.snapshots.insert(spec.clone(), created);
        Ok(())
    }

    fn snapshot_creation(&self, spec: &SnapshotSpec) -> Result<CreationTime, ZfsError> {
        self.record(
            MockOperation::SnapshotCreation(spec.clone()),
            FailOn::SnapshotCreation,
        )?;
        self.lock()
            .snapshots
            .get(spec)
            .copied()
            .ok_or_else(|| ZfsError::CommandFailed {
                command: format!("zfs get creation {}", spec),
                code: Some(1),
                stderr: format!("cannot open '{}': dataset does not exist", spec),
            })
    }

    fn destroy_snapshot(&self, spec: &SnapshotSpec) -> Result<(), ZfsError> {
        self.record(
            MockOperation::DestroySnapshot(spec.clone()),
            FailOn::DestroySnapshot,
        )?;
        let mut inner = self.lock();
        if inner.snapshots.remove(spec).is_none() {
            return Err(ZfsError::CommandFailed {
                command: format!("zfs destroy {}", spec),
                code: Some(1),
                stderr: "could not find any snapshots to destroy; check snapshot names.".to_string(),
            });
        }
        if let Some(dir) = Self::view_dir(&inner, spec) {
            if dir.is_dir() {
                fs::remove_dir_all(&dir)
                    .map_err(|e| io_failure(format!("zfs destroy {}", spec), e))?;
            }
        }
        Ok(())
    }

    fn list_snapshots(&self, dataset: &DatasetName) -> Result<Vec<SnapshotSpec>, ZfsError> {
        self.record(
            MockOperation::ListSnapshots(dataset.clone()),
            FailOn::ListSnapshots,
        )?;
        Ok(self
            .lock()
            .snapshots
            .keys()
            .filter(|s| s.dataset() == dataset)
            .cloned()
            .collect())
    }

    fn version(&self) -> Result<Vec<String>, ZfsError> {
        self.record(MockOperation::Version, FailOn::Version)?;
        Ok(vec!["zfs-2.2.2-1".to_string(), "zfs-kmod-2.2.2-1".to_string()])
    }
}
