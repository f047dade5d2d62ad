use std::path::PathBuf;

use thiserror::Error;

use crate::timestamp::TimestampError;

/// Boxed error returned by artifact codecs, which are owned by the ML framework.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize run record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{record} record has no string `context` value")]
    MissingContext { record: &'static str },

    #[error("context '{0}' cannot be used in a file name")]
    InvalidContext(String),

    #[error("remote object name '{0}' does not map to a path under the registry")]
    UnsafeObjectName(String),

    #[error("prediction {index} has {actual} samples, expected {expected}")]
    Shape {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("model artifact at {} could not be processed: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("storage backend error: {0}")]
    Backend(#[from] StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures raised by a remote object store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("object '{0}' does not exist")]
    ObjectMissing(String),
}
