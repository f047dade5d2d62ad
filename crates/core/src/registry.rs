//! The artifact registry: run params, run metrics and trained models, keyed by
//! `YYYYMMDD-HHMMSS` stamps.
//!
//! Local layout under the registry root:
//!
//! ```text
//! params/{context}-{stamp}.json
//! metrics/{context}-{stamp}.json
//! models/{stamp}.{ext}
//! ```
//!
//! With the GCS target, models are also uploaded as `models/{stamp}.{ext}`.
//! "Latest" is never stored. Locally it is the lexically greatest model file
//! name; remotely it is the object with the newest `updated` time.

use chrono::{Local, NaiveDateTime};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::artifact::ModelArtifact;
use crate::config::{Config, ModelTarget};
use crate::error::{RegistryError, Result};
use crate::stores::{self, GcsStore, ObjectStore};
use crate::timestamp::Timestamp;

pub const PARAMS_DIR: &str = "params";
pub const METRICS_DIR: &str = "metrics";
pub const MODELS_DIR: &str = "models";

/// Remote objects are written under this prefix...
pub const REMOTE_MODELS_PREFIX: &str = "models";
/// ...and looked up under this one.
pub const REMOTE_LIST_PREFIX: &str = "model";

pub const CONTEXT_KEY: &str = "context";
pub const RECORD_EXTENSION: &str = "json";

/// Params or metrics of one run. Must carry a string `context` entry.
pub type RunRecord = Map<String, Value>;

pub type Clock = fn() -> NaiveDateTime;

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub enum Backend {
    Local,
    Remote(Arc<dyn ObjectStore>),
}

impl Backend {
    pub fn target(&self) -> ModelTarget {
        match self {
            Backend::Local => ModelTarget::Local,
            Backend::Remote(_) => ModelTarget::Gcs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedResults {
    pub timestamp: Timestamp,
    pub params: Option<PathBuf>,
    pub metrics: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedModel {
    pub timestamp: Timestamp,
    pub local_path: PathBuf,
    /// Object name in the remote store, when the model was uploaded.
    pub remote_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOrigin {
    Local,
    Remote { location: String, object: String },
}

#[derive(Debug)]
pub struct LoadedModel<M> {
    pub model: M,
    /// Local file the model was read from.
    pub path: PathBuf,
    /// Stamp parsed from the file name, if it carries one.
    pub timestamp: Option<Timestamp>,
    pub origin: ModelOrigin,
}

pub struct Registry {
    root: PathBuf,
    backend: Backend,
    clock: Clock,
}

impl Registry {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::with_backend(root, Backend::Local)
    }

    pub fn remote(root: impl Into<PathBuf>, store: Arc<dyn ObjectStore>) -> Self {
        Self::with_backend(root, Backend::Remote(store))
    }

    pub fn with_backend(root: impl Into<PathBuf>, backend: Backend) -> Self {
        Self {
            root: root.into(),
            backend,
            clock: local_now,
        }
    }

    /// Build the registry described by `config`, connecting to GCS when targeted.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = &config.storage;
        let backend = match storage.target {
            ModelTarget::Local => Backend::Local,
            ModelTarget::Gcs => {
                let bucket = storage
                    .bucket
                    .as_deref()
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| {
                        RegistryError::Config(
                            "model target 'gcs' requires a bucket name".to_string(),
                        )
                    })?;
                Backend::Remote(Arc::new(GcsStore::new(bucket, &config.gcs)?))
            }
        };
        Ok(Self::with_backend(storage.local_root.clone(), backend))
    }

    /// Replace the wall clock used to stamp new records.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn params_dir(&self) -> PathBuf {
        self.root.join(PARAMS_DIR)
    }

    pub fn metrics_dir(&self) -> PathBuf {
        self.root.join(METRICS_DIR)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join(MODELS_DIR)
    }

    /// Create the params, metrics and models directories.
    ///
    /// Saving never creates them on its own.
    pub fn init(&self) -> Result<()> {
        for dir in [self.params_dir(), self.metrics_dir(), self.models_dir()] {
            fs::create_dir_all(&dir).map_err(|e| RegistryError::io(&dir, e))?;
        }
        tracing::info!("Initialized registry at {}", self.root.display());
        Ok(())
    }

    fn stamp(&self) -> Result<Timestamp> {
        Ok(Timestamp::from_datetime((self.clock)())?)
    }

    /// Write params and metrics, each only when given, under one fresh stamp.
    ///
    /// Results always stay on local disk whatever the model target is.
    pub fn save_results(
        &self,
        params: Option<&RunRecord>,
        metrics: Option<&RunRecord>,
    ) -> Result<SavedResults> {
        let timestamp = self.stamp()?;

        let params = params
            .map(|record| self.write_record(&self.params_dir(), "params", record, &timestamp))
            .transpose()?;
        let metrics = metrics
            .map(|record| self.write_record(&self.metrics_dir(), "metrics", record, &timestamp))
            .transpose()?;

        tracing::info!("Results saved locally");
        Ok(SavedResults {
            timestamp,
            params,
            metrics,
        })
    }

    fn write_record(
        &self,
        dir: &Path,
        kind: &'static str,
        record: &RunRecord,
        timestamp: &Timestamp,
    ) -> Result<PathBuf> {
        let context = record_context(record, kind)?;
        let path = dir.join(format!("{}-{}.{}", context, timestamp, RECORD_EXTENSION));
        let content = serde_json::to_vec_pretty(record)?;
        fs::write(&path, content).map_err(|e| RegistryError::io(&path, e))?;
        tracing::debug!("Wrote {} to {}", kind, path.display());
        Ok(path)
    }

    /// Save `model` locally, then upload it when the target is remote.
    ///
    /// A failed upload leaves the local file in place.
    pub async fn save_model<M: ModelArtifact>(&self, model: &M) -> Result<SavedModel> {
        let timestamp = self.stamp()?;
        let models_dir = self.models_dir();
        if !models_dir.is_dir() {
            return Err(RegistryError::io(
                &models_dir,
                io::Error::new(io::ErrorKind::NotFound, "models directory does not exist"),
            ));
        }

        let file_name = format!("{}.{}", timestamp, M::EXTENSION);
        let local_path = models_dir.join(&file_name);
        model
            .save(&local_path)
            .map_err(|source| RegistryError::Artifact {
                path: local_path.clone(),
                source,
            })?;
        tracing::info!("Model saved locally at {}", local_path.display());

        let remote_name = match &self.backend {
            Backend::Local => None,
            Backend::Remote(store) => {
                let name = format!("{}/{}", REMOTE_MODELS_PREFIX, file_name);
                store.upload(&name, &local_path).await?;
                tracing::info!("Model saved to {}/{}", store.location(), name);
                Some(name)
            }
        };

        Ok(SavedModel {
            timestamp,
            local_path,
            remote_name,
        })
    }

    /// Load the most recent model from the configured backend.
    ///
    /// `Ok(None)` means the registry holds no model. Backend failures are
    /// returned as errors, never folded into `None`.
    pub async fn load_model<M: ModelArtifact>(&self) -> Result<Option<LoadedModel<M>>> {
        match &self.backend {
            Backend::Local => self.load_local(),
            Backend::Remote(store) => self.load_remote(store.as_ref()).await,
        }
    }

    fn load_local<M: ModelArtifact>(&self) -> Result<Option<LoadedModel<M>>> {
        tracing::info!("Loading latest model from local registry...");

        let Some(path) = self.latest_local_path(M::EXTENSION)? else {
            tracing::warn!("No model found in {}", self.models_dir().display());
            return Ok(None);
        };

        tracing::info!("Loading latest model from disk ({})", path.display());
        let model = read_artifact::<M>(&path)?;
        tracing::info!("Model loaded from local disk");

        Ok(Some(LoadedModel {
            model,
            timestamp: stem_timestamp(&path),
            path,
            origin: ModelOrigin::Local,
        }))
    }

    async fn load_remote<M: ModelArtifact>(
        &self,
        store: &dyn ObjectStore,
    ) -> Result<Option<LoadedModel<M>>> {
        let location = store.location();
        tracing::info!("Loading latest model from {}...", location);

        let mut objects = store.list(REMOTE_LIST_PREFIX).await?;
        objects.retain(|object| is_artifact_name(&object.name, M::EXTENSION));
        let Some(latest) = stores::latest(&objects) else {
            tracing::warn!("No model found in {}", location);
            return Ok(None);
        };

        let path = self.mirror_path(&latest.name)?;
        store.download(&latest.name, &path).await?;
        let model = read_artifact::<M>(&path)?;
        tracing::info!("Latest model downloaded from {}", location);

        Ok(Some(LoadedModel {
            model,
            timestamp: stem_timestamp(&path),
            path,
            origin: ModelOrigin::Remote {
                location,
                object: latest.name.clone(),
            },
        }))
    }

    /// Lexically greatest `*.{extension}` file in the models directory.
    ///
    /// A missing directory counts as empty.
    pub fn latest_local_path(&self, extension: &str) -> Result<Option<PathBuf>> {
        let dir = self.models_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RegistryError::io(&dir, e)),
        };

        let mut latest: Option<PathBuf> = None;
        for entry in entries {
            let entry = entry.map_err(|e| RegistryError::io(&dir, e))?;
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != extension) {
                continue;
            }
            if latest
                .as_ref()
                .map_or(true, |best| path.file_name() > best.file_name())
            {
                latest = Some(path);
            }
        }
        Ok(latest)
    }

    /// Local path mirroring a remote object name under the registry root.
    fn mirror_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let safe = relative.components().next().is_some()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(RegistryError::UnsafeObjectName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn record_context<'a>(record: &'a RunRecord, kind: &'static str) -> Result<&'a str> {
    let context = record
        .get(CONTEXT_KEY)
        .and_then(Value::as_str)
        .ok_or(RegistryError::MissingContext { record: kind })?;
    if context.is_empty() || context.contains(['/', '\\']) || context == "." || context == ".." {
        return Err(RegistryError::InvalidContext(context.to_string()));
    }
    Ok(context)
}

/// Folder placeholders (`models/`) and files of other kinds are not models.
fn is_artifact_name(name: &str, extension: &str) -> bool {
    !name.ends_with('/')
        && Path::new(name)
            .extension()
            .map_or(false, |ext| ext == extension)
}

fn read_artifact<M: ModelArtifact>(path: &Path) -> Result<M> {
    M::load(path).map_err(|source| RegistryError::Artifact {
        path: path.to_path_buf(),
        source,
    })
}

fn stem_timestamp(path: &Path) -> Option<Timestamp> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(Timestamp::from_stem_suffix)
}
