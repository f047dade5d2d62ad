//! Model artifacts as the registry sees them: opaque files written and read by
//! whatever framework trained the model.

use std::fs;
use std::path::Path;

use crate::error::BoxError;

/// A trained model that knows how to serialize itself to a single file.
///
/// The registry never inspects artifact contents. It only chooses the path
/// (`{timestamp}.{EXTENSION}`) and hands it to `save` / `load`.
pub trait ModelArtifact: Sized {
    /// File extension without the leading dot, e.g. `"keras"`.
    const EXTENSION: &'static str;

    fn save(&self, path: &Path) -> Result<(), BoxError>;

    fn load(path: &Path) -> Result<Self, BoxError>;
}

/// Byte-exact artifact for files already serialized by an external framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArtifact {
    pub bytes: Vec<u8>,
}

impl RawArtifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_file(path: &Path) -> Result<Self, BoxError> {
        Self::load(path)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ModelArtifact for RawArtifact {
    const EXTENSION: &'static str = "keras";

    fn save(&self, path: &Path) -> Result<(), BoxError> {
        fs::write(path, &self.bytes)?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self, BoxError> {
        Ok(Self::new(fs::read(path)?))
    }
}
