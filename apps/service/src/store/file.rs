//! File-backed store: `{base}/{kind}/{id}.json`, one record per file.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{Store, StoreError};

/// JSON-file record store.
///
/// Writes to a given (kind, id) are serialized through a per-key mutex, as
/// the `Store` contract requires.
pub struct FileStore {
    base: PathBuf,
    write_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            write_locks: StdMutex::new(HashMap::new()),
        }
    }

    fn record_path(&self, kind: &str, id: &str) -> PathBuf {
        self.base.join(kind).join(format!("{id}.json"))
    }

    fn key(kind: &str, id: &str) -> String {
        format!("{kind}/{id}")
    }

    fn write_lock(&self, kind: &str, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().expect("write lock registry poisoned");
        locks.entry(Self::key(kind, id)).or_default().clone()
    }

    async fn write_record(path: &Path, record: &Value) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record).map_err(|err| StoreError::Corrupt {
            key: path.display().to_string(),
            detail: err.to_string(),
        })?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn create(&self, kind: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let lock = self.write_lock(kind, id);
        let _guard = lock.lock().await;

        let path = self.record_path(kind, id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => StoreError::AlreadyExists(Self::key(kind, id)),
                _ => StoreError::Io(err),
            })?;

        let bytes = serde_json::to_vec(record).map_err(|err| StoreError::Corrupt {
            key: Self::key(kind, id),
            detail: err.to_string(),
        })?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read(&self, kind: &str, id: &str) -> Result<Value, StoreError> {
        let path = self.record_path(kind, id);
        let bytes = tokio::fs::read(&path).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound(Self::key(kind, id)),
            _ => StoreError::Io(err),
        })?;

        serde_json::from_slice(&bytes).map_err(|err| StoreError::Corrupt {
            key: Self::key(kind, id),
            detail: err.to_string(),
        })
    }

    async fn update(&self, kind: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let lock = self.write_lock(kind, id);
        let _guard = lock.lock().await;

        let path = self.record_path(kind, id);
        if !tokio::fs::try_exists(&path).await? {
            return Err(StoreError::NotFound(Self::key(kind, id)));
        }

        Self::write_record(&path, record).await
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<(), StoreError> {
        let lock = self.write_lock(kind, id);
        let _guard = lock.lock().await;

        let path = self.record_path(kind, id);
        tokio::fs::remove_file(&path).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound(Self::key(kind, id)),
            _ => StoreError::Io(err),
        })
    }

    async fn list(&self, kind: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.base.join(kind);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(kind.to_string()));
            }
            Err(err) => return Err(StoreError::Io(err)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }

        if ids.is_empty() {
            return Err(StoreError::NotFound(kind.to_string()));
        }

        ids.sort();
        Ok(ids)
    }
}
