//! modelvault_core - Core library for model artifact persistence
//!
//! This crate provides:
//! - A timestamped registry for run params, run metrics and trained models
//! - Local disk and Google Cloud Storage backends
//! - PNG export of depth-plane predictions

pub mod artifact;
pub mod config;
pub mod error;
pub mod images;
pub mod registry;
pub mod stores;
pub mod timestamp;

pub use artifact::{ModelArtifact, RawArtifact};
pub use config::{Config, ModelTarget};
pub use error::{RegistryError, StoreError};
pub use images::save_image;
pub use registry::{LoadedModel, ModelOrigin, Registry, RunRecord, SavedModel, SavedResults};
pub use stores::{GcsStore, MemoryStore, ObjectStore};
pub use timestamp::Timestamp;
