use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::RegistryError;

pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Environment variables applied on top of the config file.
pub const ENV_MODEL_TARGET: &str = "MODEL_TARGET";
pub const ENV_BUCKET_NAME: &str = "BUCKET_NAME";
pub const ENV_LOCAL_REGISTRY_PATH: &str = "LOCAL_REGISTRY_PATH";
pub const ENV_GCS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Registry storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Google Cloud Storage settings
    #[serde(default)]
    pub gcs: GcsConfig,
}

/// Where model artifacts are persisted in addition to local disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelTarget {
    #[default]
    Local,
    Gcs,
}

impl ModelTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTarget::Local => "local",
            ModelTarget::Gcs => "gcs",
        }
    }
}

impl fmt::Display for ModelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelTarget {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "local" => Ok(ModelTarget::Local),
            "gcs" => Ok(ModelTarget::Gcs),
            other => Err(RegistryError::Config(format!(
                "unknown model target '{}' (expected 'local' or 'gcs')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend for model artifacts
    #[serde(default)]
    pub target: ModelTarget,

    /// Root of the local registry tree (default: ~/.config/modelvault/registry/)
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,

    /// Bucket name, required when target is "gcs"
    #[serde(default)]
    pub bucket: Option<String>,
}

fn default_local_root() -> PathBuf {
    Config::base_dir()
        .map(|p| p.join("registry"))
        .unwrap_or_else(|_| PathBuf::from("registry"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            target: ModelTarget::default(),
            local_root: default_local_root(),
            bucket: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcsConfig {
    /// JSON API endpoint, overridable for storage emulators
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// OAuth bearer token; falls back to GOOGLE_OAUTH_ACCESS_TOKEN
    #[serde(default)]
    pub token: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_GCS_ENDPOINT.to_string()
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
        }
    }
}

impl Config {
    /// Get the base directory: ~/.config/modelvault/
    pub fn base_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("USERPROFILE").map(PathBuf::from))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home.join(".config").join("modelvault"))
    }

    /// Load config from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load config from the default location without environment overrides
    pub fn load_file() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config file path: ~/.config/modelvault/config.toml
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Apply MODEL_TARGET, BUCKET_NAME, LOCAL_REGISTRY_PATH and the GCS token.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), RegistryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(target) = lookup(ENV_MODEL_TARGET).filter(|t| !t.is_empty()) {
            self.storage.target = target.parse()?;
        }
        if let Some(bucket) = lookup(ENV_BUCKET_NAME).filter(|b| !b.is_empty()) {
            self.storage.bucket = Some(bucket);
        }
        if let Some(root) = lookup(ENV_LOCAL_REGISTRY_PATH).filter(|r| !r.is_empty()) {
            self.storage.local_root = PathBuf::from(root);
        }
        if self.gcs.token.is_none() {
            self.gcs.token = lookup(ENV_GCS_TOKEN).filter(|t| !t.is_empty());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            target = "gcs"
            bucket = "depth-models"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.target, ModelTarget::Gcs);
        assert_eq!(config.storage.bucket.as_deref(), Some("depth-models"));
        assert_eq!(config.gcs.endpoint, DEFAULT_GCS_ENDPOINT);
    }

    #[test]
    fn unknown_target_in_file_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[storage]\ntarget = \"mlflow\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("MODEL_TARGET", "gcs"),
                ("BUCKET_NAME", "runs"),
                ("LOCAL_REGISTRY_PATH", "/tmp/registry"),
                ("GOOGLE_OAUTH_ACCESS_TOKEN", "ya29.token"),
            ]))
            .unwrap();

        assert_eq!(config.storage.target, ModelTarget::Gcs);
        assert_eq!(config.storage.bucket.as_deref(), Some("runs"));
        assert_eq!(config.storage.local_root, PathBuf::from("/tmp/registry"));
        assert_eq!(config.gcs.token.as_deref(), Some("ya29.token"));
    }

    #[test]
    fn unknown_env_target_is_a_config_error() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("MODEL_TARGET", "mlflow")]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Config(msg) if msg.contains("mlflow")));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.storage.target = ModelTarget::Gcs;
        config.storage.bucket = Some("depth-models".into());
        let root = config.storage.local_root.clone();

        config
            .apply_overrides(env(&[
                ("MODEL_TARGET", ""),
                ("BUCKET_NAME", ""),
                ("LOCAL_REGISTRY_PATH", ""),
            ]))
            .unwrap();

        assert_eq!(config.storage.target, ModelTarget::Gcs);
        assert_eq!(config.storage.bucket.as_deref(), Some("depth-models"));
        assert_eq!(config.storage.local_root, root);
    }

    #[test]
    fn file_token_wins_over_env() {
        let mut config = Config::default();
        config.gcs.token = Some("from-file".into());
        config
            .apply_overrides(env(&[("GOOGLE_OAUTH_ACCESS_TOKEN", "from-env")]))
            .unwrap();
        assert_eq!(config.gcs.token.as_deref(), Some("from-file"));
    }
}
