//! In-process object store, used in tests and for dry runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tokio::sync::RwLock;

use super::{ObjectStore, RemoteObject};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    updated: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    /// When set, every call fails with this HTTP status.
    fail_status: Option<u16>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, as an unreachable bucket would.
    pub fn failing(status: u16) -> Self {
        Self {
            objects: RwLock::default(),
            fail_status: Some(status),
        }
    }

    /// Seed an object with an explicit modification time.
    pub async fn insert(&self, name: impl Into<String>, bytes: Vec<u8>, updated: DateTime<Utc>) {
        self.objects
            .write()
            .await
            .insert(name.into(), StoredObject { bytes, updated });
    }

    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(name).map(|o| o.bytes.clone())
    }

    fn check(&self, name: &str) -> Result<(), StoreError> {
        match self.fail_status {
            Some(status) => Err(StoreError::Status {
                status,
                url: format!("memory://{}", name),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn location(&self) -> String {
        "memory://".to_string()
    }

    async fn upload(&self, name: &str, source: &Path) -> Result<(), StoreError> {
        self.check(name)?;
        let bytes = fs::read(source).map_err(|e| StoreError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        self.insert(name, bytes, Utc::now()).await;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StoreError> {
        self.check(prefix)?;
        Ok(self
            .objects
            .read()
            .await
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, object)| RemoteObject {
                name: name.clone(),
                updated: object.updated,
                size: Some(object.bytes.len() as u64),
            })
            .collect())
    }

    async fn download(&self, name: &str, dest: &Path) -> Result<u64, StoreError> {
        self.check(name)?;
        let bytes = self
            .get(name)
            .await
            .ok_or_else(|| StoreError::ObjectMissing(name.to_string()))?;

        let io_err = |e| StoreError::Io {
            path: dest.to_path_buf(),
            source: e,
        };
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(dest, &bytes).map_err(io_err)?;
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[tokio::test]
    async fn upload_list_download() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("20230101-000000.keras");
        fs::write(&source, b"weights").unwrap();

        let store = MemoryStore::new();
        store
            .upload("models/20230101-000000.keras", &source)
            .await
            .unwrap();
        store
            .insert("other/readme.txt", b"x".to_vec(), Utc.timestamp_opt(0, 0).unwrap())
            .await;

        let listed = store.list("model").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].size, Some(7));

        let dest = dir.path().join("copy").join("model.keras");
        let written = store
            .download("models/20230101-000000.keras", &dest)
            .await
            .unwrap();
        assert_eq!(written, 7);
        assert_eq!(fs::read(&dest).unwrap(), b"weights");
    }

    #[tokio::test]
    async fn download_of_unknown_object() {
        let dir = TempDir::new().unwrap();
        let err = MemoryStore::new()
            .download("models/none.keras", &dir.path().join("none"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ObjectMissing(_)));
    }

    #[tokio::test]
    async fn failing_store_fails_every_call() {
        let store = MemoryStore::failing(503);
        assert!(matches!(
            store.list("model").await,
            Err(StoreError::Status { status: 503, .. })
        ));
        assert!(store.get("model").await.is_none());
    }
}
