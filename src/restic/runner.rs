//! restic::runner
//!
//! The `BackupRunner` capability trait and the restic implementation.
//!
//! # Invocation
//!
//! ```text
//! cd <snapshot view> && restic backup --time "<creation time>" . <passthrough...>
//! ```
//!
//! Running from inside the snapshot view makes every path in the backup
//! (and every relative `--exclude`) relative to the frozen data.
//!
//! # Output
//!
//! Standard output and standard error of restic share one pipe so the
//! captured text keeps restic's own interleaving. With `echo` enabled each
//! line is forwarded to our stdout as it arrives, keeping progress visible
//! in cron logs.

use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

use crate::zfs::version_text;

/// Errors from restic housekeeping calls.
///
/// The backup run itself never errors; see [`BackupOutcome`].
#[derive(Debug, Error)]
pub enum ResticError {
    /// The restic binary could not be found.
    #[error("'{bin}' not found")]
    NotInstalled {
        /// The binary that was looked up
        bin: PathBuf,
    },

    /// The working directory of a run does not exist.
    #[error("working directory {} not found", .workdir.display())]
    WorkdirMissing {
        /// The directory restic was to run in
        workdir: PathBuf,
    },

    /// The restic binary could not be started.
    #[error("failed to run '{bin}': {source}")]
    Spawn {
        /// The binary that failed to start
        bin: PathBuf,
        /// The underlying I/O error
        source: io::Error,
    },

    /// `restic version` exited unsuccessfully.
    #[error("'{bin} version' failed (exit {code:?}): {output}")]
    VersionFailed {
        /// The binary
        bin: PathBuf,
        /// Exit code, if any
        code: Option<i32>,
        /// Captured output
        output: String,
    },
}

/// What to back up and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    /// Working directory: the read-only snapshot view.
    pub workdir: PathBuf,
    /// Value for `--time`.
    pub time: String,
    /// Arguments appended verbatim after the fixed ones.
    pub passthrough: Vec<String>,
}

impl BackupRequest {
    /// Full argument vector after the binary name.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "backup".to_string(),
            "--time".to_string(),
            self.time.clone(),
            ".".to_string(),
        ];
        args.extend(self.passthrough.iter().cloned());
        args
    }
}

/// Result of one backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    /// Exit code; `None` if the process was killed by a signal or never
    /// started.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr (or the spawn error).
    pub output: String,
}

impl BackupOutcome {
    /// Outcome of a process that exited.
    pub fn from_status(status: ExitStatus, output: String) -> Self {
        Self {
            exit_code: status.code(),
            output,
        }
    }

    /// Outcome of a process that could not be run at all.
    pub fn not_started(message: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            output: message.into(),
        }
    }

    /// Whether restic reported success.
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Process exit code to report for a failed run (always 1..=255).
    pub fn failure_exit_code(&self) -> u8 {
        match self.exit_code {
            Some(code) if (1..=255).contains(&code) => code as u8,
            _ => 1,
        }
    }
}

impl fmt::Display for BackupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(0) => write!(f, "succeeded"),
            Some(code) => write!(f, "failed (exit {})", code),
            None => write!(f, "failed (no exit status)"),
        }
    }
}

/// Narrow capability interface over the backup tool.
pub trait BackupRunner {
    /// Run one backup to completion. Never fails: a tool that cannot start
    /// yields a failed [`BackupOutcome`].
    fn run_backup(&self, request: &BackupRequest) -> BackupOutcome;

    /// Version lines reported by the tool.
    fn version(&self) -> Result<Vec<String>, ResticError>;

    /// Printable command line for logs.
    fn command_line(&self, request: &BackupRequest) -> String;
}

/// [`BackupRunner`] that executes restic.
#[derive(Debug, Clone)]
pub struct Restic {
    bin: PathBuf,
    echo: bool,
}

impl Default for Restic {
    fn default() -> Self {
        Self::new("restic")
    }
}

impl Restic {
    /// Use `bin` (a path or a name looked up on `PATH`).
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            echo: true,
        }
    }

    /// Forward restic's output lines to stdout while running.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// The configured binary.
    pub fn bin(&self) -> &Path {
        &self.bin
    }

    fn spawn_error(&self, e: io::Error) -> ResticError {
        match e.kind() {
            io::ErrorKind::NotFound => ResticError::NotInstalled {
                bin: self.bin.clone(),
            },
            _ => ResticError::Spawn {
                bin: self.bin.clone(),
                source: e,
            },
        }
    }

    /// Run with stdout and stderr merged into one pipe.
    fn stream(&self, args: &[String], workdir: &Path) -> io::Result<(ExitStatus, String)> {
        let (reader, writer) = io::pipe()?;

        let mut child = {
            let mut command = Command::new(&self.bin);
            command
                .args(args)
                .current_dir(workdir)
                .stdin(Stdio::null())
                .stdout(writer.try_clone()?)
                .stderr(writer);
            command.spawn()?
            // `command` drops here, closing our copies of the write end.
        };

        let mut output = String::new();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let read_result = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break Ok(()),
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    if self.echo {
                        println!("{}", line);
                    }
                    output.push_str(line);
                    output.push('\n');
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(e),
            }
        };

        let status = child.wait()?;
        read_result?;
        Ok((status, output))
    }
}

impl BackupRunner for Restic {
    fn run_backup(&self, request: &BackupRequest) -> BackupOutcome {
        match self.stream(&request.args(), &request.workdir) {
            Ok((status, output)) => BackupOutcome::from_status(status, output),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !request.workdir.is_dir() => {
                BackupOutcome::not_started(
                    ResticError::WorkdirMissing {
                        workdir: request.workdir.clone(),
                    }
                    .to_string(),
                )
            }
            Err(e) => BackupOutcome::not_started(self.spawn_error(e).to_string()),
        }
    }

    fn version(&self) -> Result<Vec<String>, ResticError> {
        let output = Command::new(&self.bin)
            .arg("version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        let text = version_text(&output);
        if !output.status.success() {
            return Err(ResticError::VersionFailed {
                bin: self.bin.clone(),
                code: output.status.code(),
                output: text,
            });
        }
        Ok(text.lines().map(str::to_string).collect())
    }

    fn command_line(&self, request: &BackupRequest) -> String {
        std::iter::once(self.bin.display().to_string())
            .chain(request.args().iter().map(|a| shell_quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Quote an argument for display if it contains whitespace or quotes.
fn shell_quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn request(workdir: &Path, passthrough: &[&str]) -> BackupRequest {
        BackupRequest {
            workdir: workdir.to_path_buf(),
            time: "2024-01-15 02:00:00".to_string(),
            passthrough: passthrough.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-restic");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn args_order() {
        let req = request(Path::new("/snap"), &["--tag", "nightly", "--dry-run"]);
        assert_eq!(
            req.args(),
            vec![
                "backup",
                "--time",
                "2024-01-15 02:00:00",
                ".",
                "--tag",
                "nightly",
                "--dry-run"
            ]
        );
    }

    #[test]
    fn command_line_quotes_time() {
        let restic = Restic::new("restic");
        let req = request(Path::new("/snap"), &["--exclude", "cache dir"]);
        assert_eq!(
            restic.command_line(&req),
            "restic backup --time '2024-01-15 02:00:00' . --exclude 'cache dir'"
        );
    }

    #[test]
    fn failure_exit_code_clamped() {
        let outcome = |code| BackupOutcome {
            exit_code: code,
            output: String::new(),
        };
        assert_eq!(outcome(Some(3)).failure_exit_code(), 3);
        assert_eq!(outcome(Some(0)).failure_exit_code(), 1);
        assert_eq!(outcome(Some(-1)).failure_exit_code(), 1);
        assert_eq!(outcome(Some(300)).failure_exit_code(), 1);
        assert_eq!(outcome(None).failure_exit_code(), 1);
    }

    #[test]
    fn runs_in_workdir_and_captures_both_streams() {
        let temp = TempDir::new().unwrap();
        let workdir = temp.path().join("view");
        std::fs::create_dir(&workdir).unwrap();
        let bin = script(temp.path(), "echo \"cwd=$(pwd)\"\necho \"args=$*\"\necho oops >&2\nexit 3");

        let outcome = Restic::new(&bin)
            .echo(false)
            .run_backup(&request(&workdir, &["--tag", "x"]));

        assert_eq!(outcome.exit_code, Some(3));
        assert!(!outcome.is_success());
        assert!(outcome.output.contains(&format!("cwd={}", workdir.display())));
        assert!(outcome
            .output
            .contains("args=backup --time 2024-01-15 02:00:00 . --tag x"));
        assert!(outcome.output.contains("oops"));
    }

    #[test]
    fn success_outcome() {
        let temp = TempDir::new().unwrap();
        let bin = script(temp.path(), "exit 0");
        let outcome = Restic::new(&bin).echo(false).run_backup(&request(temp.path(), &[]));
        assert!(outcome.is_success());
    }

    #[test]
    fn missing_binary_is_failed_outcome() {
        let temp = TempDir::new().unwrap();
        let outcome = Restic::new(temp.path().join("missing"))
            .echo(false)
            .run_backup(&request(temp.path(), &[]));
        assert_eq!(outcome.exit_code, None);
        assert!(outcome.output.contains("not found"));
    }

    #[test]
    fn missing_workdir_is_named_not_binary() {
        let temp = TempDir::new().unwrap();
        let bin = script(temp.path(), "exit 0");
        let gone = temp.path().join("snapshot-view");
        let outcome = Restic::new(&bin)
            .echo(false)
            .run_backup(&request(&gone, &[]));
        assert_eq!(outcome.exit_code, None);
        assert_eq!(
            outcome.output,
            format!("working directory {} not found", gone.display())
        );
        assert!(!outcome.output.contains("fake-restic"));
    }

    #[test]
    fn version_lines() {
        let temp = TempDir::new().unwrap();
        let bin = script(temp.path(), "echo 'restic 0.16.4 compiled with go1.21.6 on linux/amd64'");
        let lines = Restic::new(&bin).version().unwrap();
        assert_eq!(lines, vec!["restic 0.16.4 compiled with go1.21.6 on linux/amd64"]);
    }

    #[test]
    fn version_failure() {
        let temp = TempDir::new().unwrap();
        let bin = script(temp.path(), "echo broken >&2\nexit 2");
        match Restic::new(&bin).version() {
            Err(ResticError::VersionFailed { code, output, .. }) => {
                assert_eq!(code, Some(2));
                assert_eq!(output, "broken");
            }
            other => panic!("expected VersionFailed, got {:?}", other),
        }
    }
}
