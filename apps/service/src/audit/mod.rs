//! Per-check audit logs.
//!
//! Every evaluation appends one JSON line to `{logs_dir}/{id}.log`. Appends
//! are best-effort from the pipeline's point of view: a failure here is
//! reported and never blocks persisting or alerting. Each log is a
//! single-writer resource; the rotator takes the same per-log lock before
//! reading and truncating.

pub mod rotation;

pub use rotation::LogRotator;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::models::{Check, CheckState};
use crate::monitoring::types::ProbeOutcome;

const LOG_EXTENSION: &str = "log";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("audit record serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One audit record per evaluation, serialized as a single JSON line.
/// Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Snapshot of the check as persisted after this evaluation
    pub check: Check,
    pub outcome: ProbeOutcome,
    pub state: CheckState,
    /// Whether this evaluation triggered an alert
    pub alert: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
}

struct LogDir {
    base: PathBuf,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Append-only writer for per-check audit logs.
///
/// Cloneable handle; clones share the per-log writer locks, so an append
/// never interleaves with rotation of the same log.
#[derive(Clone)]
pub struct AuditLogger {
    dir: Arc<LogDir>,
}

impl AuditLogger {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(LogDir {
                base: base.into(),
                locks: StdMutex::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn base(&self) -> &Path {
        &self.dir.base
    }

    pub(crate) fn log_path(&self, id: &str) -> PathBuf {
        self.dir.base.join(format!("{id}.{LOG_EXTENSION}"))
    }

    pub(crate) fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.dir.locks.lock().expect("log lock registry poisoned");
        locks.entry(id.to_string()).or_default().clone()
    }

    /// Append one record to the check's log, creating the log if absent.
    pub async fn append(&self, record: &LogRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let lock = self.lock_for(&record.check.id);
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.dir.base).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.log_path(&record.check.id))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Ids of all live (uncompressed) logs; archives are excluded.
    pub async fn live_logs(&self) -> Result<Vec<String>, AuditError> {
        let mut entries = match tokio::fs::read_dir(&self.dir.base).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == LOG_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HttpMethod, Protocol};

    fn record(id: &str) -> LogRecord {
        let check = Check {
            id: id.into(),
            user_phone: "5551234567".into(),
            protocol: Protocol::Http,
            url: "example.com".into(),
            method: HttpMethod::Get,
            success_codes: vec![200],
            timeout_seconds: 3,
            state: CheckState::Up,
            last_checked: DateTime::from_timestamp_millis(1_700_000_000_000),
        };
        LogRecord {
            check,
            outcome: ProbeOutcome::Response { code: 200 },
            state: CheckState::Up,
            alert: false,
            time: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        }
    }

    #[tokio::test]
    async fn append_creates_log_and_accumulates_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path());

        logger.append(&record("check-one")).await.unwrap();
        logger.append(&record("check-one")).await.unwrap();

        let contents =
            std::fs::read_to_string(dir.path().join("check-one.log")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: LogRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.check.id, "check-one");
        assert!(!parsed.alert);
    }

    #[tokio::test]
    async fn live_logs_lists_each_check_once() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path());

        logger.append(&record("bb")).await.unwrap();
        logger.append(&record("aa")).await.unwrap();
        logger.append(&record("aa")).await.unwrap();

        assert_eq!(logger.live_logs().await.unwrap(), vec!["aa", "bb"]);
    }

    #[tokio::test]
    async fn live_logs_is_empty_before_any_append() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path().join("missing"));
        assert!(logger.live_logs().await.unwrap().is_empty());
    }
}
