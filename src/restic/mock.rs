//! restic::mock
//!
//! Mock backup runner for deterministic testing.
//!
//! Returns a configured exit code and records every request, so tests can
//! assert on the working directory, the `--time` value and the passthrough
//! arguments without running restic.

use std::sync::{Arc, Mutex};

use super::runner::{BackupOutcome, BackupRequest, BackupRunner, ResticError};

/// Mock restic for testing.
#[derive(Debug, Clone)]
pub struct MockRestic {
    inner: Arc<Mutex<MockResticInner>>,
}

#[derive(Debug)]
struct MockResticInner {
    exit_code: Option<i32>,
    output: String,
    version_available: bool,
    requests: Vec<BackupRequest>,
    workdir_existed: Vec<bool>,
}

impl Default for MockRestic {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRestic {
    /// A runner whose backups succeed.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockResticInner {
                exit_code: Some(0),
                output: "snapshot 1a2b3c4d saved\n".to_string(),
                version_available: true,
                requests: Vec::new(),
                workdir_existed: Vec::new(),
            })),
        }
    }

    /// A runner whose backups exit with `code`.
    pub fn exiting_with(code: i32) -> Self {
        let mock = Self::new();
        {
            let mut inner = mock.inner.lock().unwrap();
            inner.exit_code = Some(code);
            inner.output = format!("Fatal: backup failed with exit {}\n", code);
        }
        mock
    }

    /// Make `version` fail as if restic were not installed.
    pub fn not_installed(self) -> Self {
        self.inner.lock().unwrap().version_available = false;
        self
    }

    /// Every backup request received, in order.
    pub fn requests(&self) -> Vec<BackupRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Whether each request's working directory existed when it ran.
    pub fn workdir_existed(&self) -> Vec<bool> {
        self.inner.lock().unwrap().workdir_existed.clone()
    }
}

impl BackupRunner for MockRestic {
    fn run_backup(&self, request: &BackupRequest) -> BackupOutcome {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request.clone());
        inner.workdir_existed.push(request.workdir.is_dir());
        BackupOutcome {
            exit_code: inner.exit_code,
            output: inner.output.clone(),
        }
    }

    fn version(&self) -> Result<Vec<String>, ResticError> {
        if self.inner.lock().unwrap().version_available {
            Ok(vec!["restic 0.16.4 compiled with go1.21.6 on linux/amd64".to_string()])
        } else {
            Err(ResticError::NotInstalled {
                bin: "restic".into(),
            })
        }
    }

    fn command_line(&self, request: &BackupRequest) -> String {
        format!("restic {}", request.args().join(" "))
    }
}
