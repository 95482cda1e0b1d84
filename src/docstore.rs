//! Content store for rendered payslip documents.
//!
//! Documents are addressed by a deterministic key derived from the period
//! and payslip id, so re-rendering a payslip overwrites the same object
//! instead of creating a second one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{PayrollError, PayrollResult};

/// Stable storage key for a payslip's document.
pub fn payslip_key(period_id: &str, payslip_id: u64) -> String {
    format!("payslips/{period_id}/payslip-{payslip_id}.txt")
}

#[allow(async_fn_in_trait)]
pub trait DocumentStore: Send + Sync {
    /// Stores the object, replacing any previous content under the key. A
    /// failed attempt must leave no partial object behind.
    async fn put(&self, key: &str, bytes: &[u8]) -> PayrollResult<()>;

    async fn get(&self, key: &str) -> PayrollResult<Option<Vec<u8>>>;
}

/// Filesystem-backed store rooted at a configured directory.
#[derive(Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

fn persistence(path: &Path, e: std::io::Error) -> PayrollError {
    PayrollError::Persistence {
        message: format!("document store i/o on {}: {e}", path.display()),
    }
}

impl DocumentStore for FsDocumentStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> PayrollResult<()> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| persistence(parent, e))?;
        }
        // Write-then-rename keeps a failed attempt from leaving a partial
        // document under the final key.
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| persistence(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| persistence(&path, e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> PayrollResult<Option<Vec<u8>>> {
        let path = self.object_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persistence(&path, e)),
        }
    }
}

/// In-memory store for tests.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> PayrollResult<()> {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> PayrollResult<Option<Vec<u8>>> {
        Ok(self.objects.lock().await.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_per_payslip() {
        assert_eq!(payslip_key("2024-05", 1), "payslips/2024-05/payslip-1.txt");
        assert_eq!(payslip_key("2024-05", 1), payslip_key("2024-05", 1));
        assert_ne!(payslip_key("2024-05", 1), payslip_key("2024-06", 1));
    }

    #[tokio::test]
    async fn memory_store_overwrites_same_key() {
        let store = MemoryDocumentStore::new();
        store.put("k", b"one").await.unwrap();
        store.put("k", b"two").await.unwrap();
        assert_eq!(store.object_count().await, 1);
        assert_eq!(store.get("k").await.unwrap().unwrap(), b"two");
    }

    #[tokio::test]
    async fn missing_object_reads_as_none() {
        let store = MemoryDocumentStore::new();
        assert!(store.get("absent").await.unwrap().is_none());
    }
}
