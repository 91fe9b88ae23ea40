//! Directory-backed report store
//!
//! There is no index beyond the directory itself: every query walks the
//! report directory, decodes each `nmt_<pid>_<ts>.txt` name, evicts whatever
//! has aged past the retention horizon, and parses only the artifacts inside
//! the requested window. Nothing is cached between queries.
//!
//! Directory layout:
//! ```text
//! /tmp/nmt/
//! ├── nmt_53732_1764484822.txt
//! ├── nmt_53732_1764484832.txt
//! ├── .nmt_Xa81k2.tmp          (collection in progress, removed once stale)
//! └── ...
//! ```

use super::naming;
use super::parser::parse_report;
use super::types::{Report, ReportId};
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of an eviction attempt on one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictOutcome {
    /// Still inside the retention horizon
    Retained,
    /// Expired and removed by this call
    Evicted,
    /// Expired, but another scan removed it first
    AlreadyGone,
    /// Expired, removal failed (logged, never surfaced to the query)
    Failed,
}

/// Query engine over a directory of NMT artifacts
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
    retention: Duration,
}

/// Per-scan parameters, fixed when the scan starts
struct ScanWindow<'a> {
    begin: i64,
    end: i64,
    now: i64,
    cancel: &'a CancellationToken,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            dir: dir.into(),
            retention,
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(storage.report_dir.clone(), storage.retention())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Oldest capture time still retained at `now`
    pub fn horizon(&self, now: i64) -> i64 {
        let secs = i64::try_from(self.retention.as_secs()).unwrap_or(i64::MAX);
        now.saturating_sub(secs)
    }

    pub fn is_expired(&self, id: ReportId, now: i64) -> bool {
        id.created < self.horizon(now)
    }

    /// Reports captured within `[begin, end]` (inclusive).
    ///
    /// `begin < end` is the caller's responsibility. Results follow directory
    /// order; sort them if chronology matters.
    pub async fn query(&self, begin: i64, end: i64) -> Result<Vec<Report>> {
        self.query_with_cancel(begin, end, &CancellationToken::new())
            .await
    }

    /// Same as [`query`](Self::query), aborting with [`Error::Cancelled`]
    /// once `cancel` fires.
    pub async fn query_with_cancel(
        &self,
        begin: i64,
        end: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Report>> {
        let store = self.clone();
        let cancel = cancel.clone();
        let now = chrono::Utc::now().timestamp();

        tokio::task::spawn_blocking(move || store.scan(begin, end, now, &cancel))
            .await
            .map_err(|e| Error::Internal(format!("Report scan task failed: {}", e)))?
    }

    /// Blocking scan of the whole directory tree as of `now`
    pub fn scan(
        &self,
        begin: i64,
        end: i64,
        now: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Report>> {
        let window = ScanWindow {
            begin,
            end,
            now,
            cancel,
        };
        let mut reports = Vec::new();

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %self.dir.display(), "Report directory does not exist yet");
                return Ok(reports);
            }
            Err(e) => return Err(e.into()),
        };

        self.walk(entries, &window, &mut reports)?;

        tracing::debug!(
            dir = %self.dir.display(),
            begin,
            end,
            matched = reports.len(),
            "Report scan complete"
        );
        Ok(reports)
    }

    fn walk(
        &self,
        entries: std::fs::ReadDir,
        window: &ScanWindow<'_>,
        reports: &mut Vec<Report>,
    ) -> Result<()> {
        for entry in entries {
            if window.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Entry vanished during scan");
                    continue;
                }
            };

            if file_type.is_dir() {
                match std::fs::read_dir(&path) {
                    Ok(children) => self.walk(children, window, reports)?,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to read subdirectory");
                    }
                }
            } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
                if let Some(report) = self.visit_file(&path, window) {
                    reports.push(report);
                }
            }
        }

        if window.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Decode, evict, window-filter and finally load one artifact
    fn visit_file(&self, path: &Path, window: &ScanWindow<'_>) -> Option<Report> {
        let name = path.file_name()?.to_str()?;
        if naming::is_staging_name(name) {
            self.evict_stale_staging(path, window.now);
            return None;
        }
        if !naming::is_artifact_name(name) {
            return None;
        }

        let id = match naming::decode(name) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unrecognized report file");
                return None;
            }
        };

        if self.evict_if_expired(path, id, window.now) != EvictOutcome::Retained {
            return None;
        }

        if id.created < window.begin || id.created > window.end {
            return None;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable report");
                return None;
            }
        };
        let text = String::from_utf8_lossy(&bytes);

        Some(Report::new(id, parse_report(&text)))
    }

    /// Remove a staging file whose last write is past the retention horizon.
    /// These are left behind when a collection is killed mid-run.
    fn evict_stale_staging(&self, path: &Path, now: i64) -> EvictOutcome {
        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => chrono::DateTime::<chrono::Utc>::from(modified).timestamp(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return EvictOutcome::AlreadyGone,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot stat staging file");
                return EvictOutcome::Failed;
            }
        };
        if modified >= self.horizon(now) {
            return EvictOutcome::Retained;
        }

        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), modified, "Removed abandoned staging file");
                EvictOutcome::Evicted
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => EvictOutcome::AlreadyGone,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Error deleting staging file");
                EvictOutcome::Failed
            }
        }
    }

    /// Delete `path` if `id` is past the retention horizon at `now`.
    ///
    /// Idempotent and safe to race: a file that is already gone counts as
    /// evicted by someone else, and removal errors are only logged.
    pub fn evict_if_expired(&self, path: &Path, id: ReportId, now: i64) -> EvictOutcome {
        if !self.is_expired(id, now) {
            return EvictOutcome::Retained;
        }

        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    pid = id.pid,
                    created = id.created,
                    "Evicted expired NMT report"
                );
                EvictOutcome::Evicted
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Expired report already removed");
                EvictOutcome::AlreadyGone
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Error deleting expired report");
                EvictOutcome::Failed
            }
        }
    }
}

/// Query `dir` for reports captured in `[begin, end]`, evicting anything
/// older than `retention` along the way.
pub async fn list_reports(
    dir: impl Into<PathBuf>,
    retention: Duration,
    begin: i64,
    end: i64,
) -> Result<Vec<Report>> {
    ReportStore::new(dir, retention).query(begin, end).await
}
