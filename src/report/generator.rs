//! Report generator
//!
//! Runs `<jcmd> <pid> VM.native_memory summary` and stores its stdout as a
//! new artifact. Output is written to a hidden staging file in the report
//! directory and moved under its final `nmt_<pid>_<ts>.txt` name only after
//! the command succeeded, so a concurrent scan never sees a partial report.

use super::naming;
use crate::collector::Collector;
use crate::config::NmtScopeConfig;
use crate::error::GenerationError;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

const NMT_COMMAND: &str = "VM.native_memory";
const NMT_MODE: &str = "summary";
/// Mode of a finished artifact, before the process umask applies
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

/// Collects NMT summaries for one process into one directory
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    command: String,
    pid: i32,
    output_dir: PathBuf,
    /// Upper bound on a single command run (None = wait forever)
    timeout: Option<Duration>,
}

enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

impl ReportGenerator {
    pub fn new(command: impl Into<String>, pid: i32, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            pid,
            output_dir: output_dir.into(),
            timeout: None,
        }
    }

    /// Build a generator from the collector and storage sections
    pub fn from_config(config: &NmtScopeConfig) -> Self {
        let timeout = match config.collector.command_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            command: config.collector.jcmd.clone(),
            pid: config.collector.pid,
            output_dir: config.storage.report_dir.clone(),
            timeout,
        }
    }

    /// Kill the command if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Capture one report and return the final artifact path.
    ///
    /// Nothing is left in the directory when this returns an error.
    pub async fn generate(&self, cancel: &CancellationToken) -> Result<PathBuf, GenerationError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| GenerationError::CreateDir {
                path: self.output_dir.clone(),
                source,
            })?;

        let created = chrono::Utc::now().timestamp();
        let final_path = self.output_dir.join(naming::encode(self.pid, created));
        if tokio::fs::try_exists(&final_path).await.unwrap_or(false) {
            return Err(GenerationError::Duplicate { path: final_path });
        }

        let mut builder = tempfile::Builder::new();
        builder
            .prefix(naming::STAGING_PREFIX)
            .suffix(naming::STAGING_SUFFIX);
        // Staging files default to 0600; the rename keeps whatever mode we set here.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(ARTIFACT_MODE));
        }
        let staging = builder
            .tempfile_in(&self.output_dir)
            .map_err(|source| self.create_file_error(source))?;
        let stdout = staging
            .as_file()
            .try_clone()
            .map_err(|source| self.create_file_error(source))?;

        tracing::debug!(
            pid = self.pid,
            command = %self.command,
            staging = %staging.path().display(),
            "Running NMT summary"
        );

        let mut child = Command::new(&self.command)
            .arg(self.pid.to_string())
            .arg(NMT_COMMAND)
            .arg(NMT_MODE)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GenerationError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let status = match self.wait(&mut child, cancel).await {
            WaitOutcome::Exited(status) => status.map_err(|source| GenerationError::Spawn {
                command: self.command.clone(),
                source,
            })?,
            WaitOutcome::TimedOut => {
                let _ = child.kill().await;
                return Err(GenerationError::TimedOut {
                    command: self.command.clone(),
                    secs: self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
                });
            }
            WaitOutcome::Cancelled => {
                let _ = child.kill().await;
                return Err(GenerationError::Cancelled);
            }
        };

        if !status.success() {
            return Err(GenerationError::ExitStatus {
                command: self.command.clone(),
                status,
            });
        }

        staging
            .persist_noclobber(&final_path)
            .map_err(|e| match e.error.kind() {
                std::io::ErrorKind::AlreadyExists => GenerationError::Duplicate {
                    path: final_path.clone(),
                },
                _ => GenerationError::Persist {
                    path: final_path.clone(),
                    source: e.error,
                },
            })?;

        tracing::info!(
            pid = self.pid,
            created,
            path = %final_path.display(),
            "Generated NMT report"
        );
        Ok(final_path)
    }

    async fn wait(&self, child: &mut Child, cancel: &CancellationToken) -> WaitOutcome {
        let exited = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                    Ok(status) => WaitOutcome::Exited(status),
                    Err(_) => WaitOutcome::TimedOut,
                },
                None => WaitOutcome::Exited(child.wait().await),
            }
        };

        tokio::select! {
            outcome = exited => outcome,
            _ = cancel.cancelled() => WaitOutcome::Cancelled,
        }
    }

    fn create_file_error(&self, source: std::io::Error) -> GenerationError {
        GenerationError::CreateFile {
            dir: self.output_dir.clone(),
            source,
        }
    }
}

#[async_trait::async_trait]
impl Collector for ReportGenerator {
    async fn collect(&self, cancel: &CancellationToken) -> crate::Result<PathBuf> {
        Ok(self.generate(cancel).await?)
    }

    fn describe(&self) -> String {
        format!("pid {} -> {}", self.pid, self.output_dir.display())
    }
}

/// One-shot collection with no timeout and no cancellation
pub async fn generate_report(
    command: &str,
    pid: i32,
    output_dir: impl Into<PathBuf>,
) -> Result<PathBuf, GenerationError> {
    ReportGenerator::new(command, pid, output_dir)
        .generate(&CancellationToken::new())
        .await
}
