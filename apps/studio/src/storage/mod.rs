//! Storage Port — the key/value store templates are persisted to.
//!
//! The core never talks to a concrete store. Callers hold an
//! `Arc<dyn StoragePort>`: `MemoryStorage` for tests and ephemeral servers,
//! `FileStorage` for a directory of JSON documents.

pub mod repository;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub use repository::{FilledRepository, TemplateRepository, FILLED_KEY, TEMPLATES_KEY};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Encoding error: {0}")]
    Codec(#[from] crate::grid::CodecError),
}

#[async_trait]
pub trait StoragePort: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryStorage
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: impl Into<String>) -> Self {
        Self {
            entries: RwLock::new(HashMap::from([(key.to_string(), value.into())])),
        }
    }
}

#[async_trait]
impl StoragePort for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FileStorage
// ────────────────────────────────────────────────────────────────────────────

/// One `<key>.json` document per key under `root`. Writes go through a
/// temporary file and a rename so readers never see a partial document.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    write_lock: RwLock<()>,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: RwLock::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::Backend(format!("invalid storage key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

#[async_trait]
impl StoragePort for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.read().await;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        let _guard = self.write_lock.write().await;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&tmp, value.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let store = MemoryStorage::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::new(dir.path().join("nested"));
        assert_eq!(store.get("form_templates").await.unwrap(), None);

        store.set("form_templates", "[]".to_string()).await.unwrap();
        store.set("form_templates", "[1]".to_string()).await.unwrap();
        assert_eq!(
            store.get("form_templates").await.unwrap().as_deref(),
            Some("[1]")
        );
        assert!(!dir.path().join("nested/form_templates.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::new(dir.path());
        let err = store.set("../escape", "x".to_string()).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
