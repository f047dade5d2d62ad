use anyhow::{Context, Result};
use modelvault_core::{Config, ModelOrigin, RawArtifact, Registry};
use std::fs;
use std::path::Path;

pub async fn execute(output: Option<&Path>) -> Result<()> {
    let config = Config::load()?;
    let registry = Registry::from_config(&config)?;

    println!("Model target: {}", registry.backend().target());

    let Some(loaded) = registry.load_model::<RawArtifact>().await? else {
        println!("No model found.");
        println!("\nRun `modelvault push <file>` to register one.");
        return Ok(());
    };

    let stamp = loaded
        .timestamp
        .as_ref()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "(no stamp)".to_string());

    println!("Latest model: {}", loaded.path.display());
    println!("  stamp:  {}", stamp);
    println!("  size:   {} bytes", loaded.model.len());
    match &loaded.origin {
        ModelOrigin::Local => println!("  source: local registry"),
        ModelOrigin::Remote { location, object } => {
            println!("  source: {}/{}", location, object)
        }
    }

    if let Some(output) = output {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, &loaded.model.bytes)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Copied to {}", output.display());
    }

    Ok(())
}
