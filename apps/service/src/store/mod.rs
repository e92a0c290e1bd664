//! Durable record storage.
//!
//! The engine treats storage as a mapping of entity kind + id to a JSON
//! record. The default implementation keeps one JSON file per record under
//! a directory per kind.

pub mod file;

pub use file::FileStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("malformed record at {key}: {detail}")]
    Corrupt { key: String, detail: String },
    #[error("storage i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable mapping of entity kind + id to a JSON record.
///
/// Contract: implementations serialize writes per (kind, id) — at most one
/// in-flight update for a given key at any time, so concurrent sweeps can
/// never apply a stale record on top of a newer one.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create a new record; fails if the key already exists.
    async fn create(&self, kind: &str, id: &str, record: &Value) -> Result<(), StoreError>;

    /// Read a record; fails with `NotFound` if absent.
    async fn read(&self, kind: &str, id: &str) -> Result<Value, StoreError>;

    /// Replace an existing record; fails with `NotFound` if absent.
    async fn update(&self, kind: &str, id: &str, record: &Value) -> Result<(), StoreError>;

    /// Remove a record; fails with `NotFound` if absent.
    async fn delete(&self, kind: &str, id: &str) -> Result<(), StoreError>;

    /// Enumerate all record ids under a kind; fails with `NotFound` when
    /// the kind's namespace is empty or absent.
    async fn list(&self, kind: &str) -> Result<Vec<String>, StoreError>;
}
