//! Log rotation: compress live logs into write-once archives, then
//! truncate the originals so future appends start clean.

use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use super::AuditLogger;

const ARCHIVE_SUFFIX: &str = "zst.b64";
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum RotationError {
    #[error("archive already exists: {}", .0.display())]
    ArchiveExists(PathBuf),
    #[error("rotation i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("compression failed: {0}")]
    Compression(String),
    #[error("archive is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
}

/// Compresses and truncates per-check audit logs into timestamped,
/// base64-encoded archives named `{checkId}-{millis}.zst.b64`.
pub struct LogRotator {
    logs: AuditLogger,
}

impl LogRotator {
    pub fn new(logs: AuditLogger) -> Self {
        Self { logs }
    }

    /// Rotate every live log. A failure on one log is reported and does not
    /// prevent rotation of the others; only failure to enumerate the logs
    /// at all is returned.
    pub async fn rotate_all(&self, now: DateTime<Utc>) -> Result<(), RotationError> {
        let ids = self
            .logs
            .live_logs()
            .await
            .map_err(|err| RotationError::Io(std::io::Error::other(err.to_string())))?;

        if ids.is_empty() {
            tracing::debug!("no logs to rotate");
            return Ok(());
        }

        for id in ids {
            match self.rotate_one(&id, now).await {
                Ok(archive) => {
                    tracing::info!(check_id = %id, archive = %archive.display(), "log rotated");
                }
                Err(err) => {
                    tracing::warn!(check_id = %id, error = %err, "log rotation failed");
                }
            }
        }

        Ok(())
    }

    /// Compress one log into a new archive and truncate the original to
    /// zero bytes. The log file itself is never deleted.
    pub async fn rotate_one(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, RotationError> {
        // Exclusive access: no append may interleave with read + truncate
        let lock = self.logs.lock_for(id);
        let _guard = lock.lock().await;

        let source = self.logs.log_path(id);
        let contents = tokio::fs::read(&source).await?;
        let encoded = compress(&contents)?;

        let archive = self
            .logs
            .base()
            .join(format!("{id}-{}.{ARCHIVE_SUFFIX}", now.timestamp_millis()));

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&archive)
            .await
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::AlreadyExists => RotationError::ArchiveExists(archive.clone()),
                _ => RotationError::Io(err),
            })?;
        file.write_all(encoded.as_bytes()).await?;
        file.flush().await?;

        tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&source)
            .await?;

        Ok(archive)
    }
}

/// zstd-compress and base64-encode a log's raw bytes.
pub fn compress(bytes: &[u8]) -> Result<String, RotationError> {
    let compressed = zstd::stream::encode_all(bytes, ZSTD_LEVEL)
        .map_err(|err| RotationError::Compression(err.to_string()))?;
    Ok(BASE64.encode(compressed))
}

/// Invert `compress`: decode an archive's contents back to the original
/// log bytes.
pub fn decompress(encoded: &str) -> Result<Vec<u8>, RotationError> {
    let compressed = BASE64.decode(encoded.trim_end())?;
    zstd::stream::decode_all(compressed.as_slice())
        .map_err(|err| RotationError::Compression(err.to_string()))
}
