pub mod gcs;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::error::StoreError;

pub use gcs::GcsStore;
pub use memory::MemoryStore;

/// Object metadata as reported by the remote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub name: String,
    pub updated: DateTime<Utc>,
    pub size: Option<u64>,
}

/// Remote storage for model artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human readable location, e.g. `gs://bucket`.
    fn location(&self) -> String;

    /// Upload the file at `source` as object `name`.
    async fn upload(&self, name: &str, source: &Path) -> Result<(), StoreError>;

    /// List every object whose name starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StoreError>;

    /// Download object `name` to `dest`, returning the number of bytes written.
    async fn download(&self, name: &str, dest: &Path) -> Result<u64, StoreError>;
}

/// Most recently updated object, ties broken by name.
pub fn latest(objects: &[RemoteObject]) -> Option<&RemoteObject> {
    objects
        .iter()
        .max_by(|a, b| a.updated.cmp(&b.updated).then_with(|| a.name.cmp(&b.name)))
}
