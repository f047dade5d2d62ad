use anyhow::{Context, Result};
use modelvault_core::{Config, RawArtifact, Registry};
use std::path::Path;

pub async fn execute(file: &Path) -> Result<()> {
    let config = Config::load()?;
    let registry = Registry::from_config(&config)?;

    let artifact = read_model_file(file)?;
    let saved = registry.save_model(&artifact).await?;

    println!("Saved {} ({} bytes)", saved.local_path.display(), artifact.len());
    if let Some(name) = saved.remote_name {
        println!("Uploaded as {}", name);
    }

    Ok(())
}

fn read_model_file(file: &Path) -> Result<RawArtifact> {
    let artifact = RawArtifact::from_file(file)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("Failed to read model file {}", file.display()))?;

    if artifact.is_empty() {
        anyhow::bail!("Refusing to register empty model file {}", file.display());
    }
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_model_file_is_refused() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("model.keras");
        fs::write(&file, b"").unwrap();

        let err = read_model_file(&file).unwrap_err();
        assert!(err.to_string().contains("empty model file"));
    }

    #[test]
    fn model_file_is_read_whole() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("model.keras");
        fs::write(&file, b"weights").unwrap();

        assert_eq!(read_model_file(&file).unwrap().bytes, b"weights");
    }
}
