use anyhow::Result;
use modelvault_core::Config;

use super::local_registry;

pub async fn execute() -> Result<()> {
    let config = Config::load()?;
    let registry = local_registry(&config);
    registry.init()?;

    println!("Registry ready at {}", registry.root().display());
    println!("  params:  {}", registry.params_dir().display());
    println!("  metrics: {}", registry.metrics_dir().display());
    println!("  models:  {}", registry.models_dir().display());
    println!("Model target: {}", config.storage.target);

    Ok(())
}
