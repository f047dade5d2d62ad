use anyhow::{Context, Result};
use modelvault_core::{Config, RunRecord};
use std::fs;
use std::path::Path;

use super::local_registry;

pub async fn execute(params: Option<&Path>, metrics: Option<&Path>) -> Result<()> {
    if params.is_none() && metrics.is_none() {
        anyhow::bail!("Nothing to save: pass --params and/or --metrics");
    }

    let config = Config::load()?;
    let registry = local_registry(&config);

    let params = params.map(read_record).transpose()?;
    let metrics = metrics.map(read_record).transpose()?;

    let saved = registry.save_results(params.as_ref(), metrics.as_ref())?;

    if let Some(path) = saved.params {
        println!("Params saved to {}", path.display());
    }
    if let Some(path) = saved.metrics {
        println!("Metrics saved to {}", path.display());
    }

    Ok(())
}

fn read_record(path: &Path) -> Result<RunRecord> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_record(&content).with_context(|| format!("Invalid run record in {}", path.display()))
}

fn parse_record(content: &str) -> Result<RunRecord> {
    match serde_json::from_str(content)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => anyhow::bail!("expected a JSON object"),
    }
}
