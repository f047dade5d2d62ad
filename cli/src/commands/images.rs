use anyhow::{Context, Result};
use modelvault_core::save_image;
use std::fs;
use std::path::Path;

/// Batch of flat prediction buffers, one JSON array per image.
type Batch = Vec<Vec<f32>>;

pub async fn execute(input: &Path, out: &Path, name: &str) -> Result<()> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let batch = parse_batch(&content)
        .with_context(|| format!("Invalid prediction batch in {}", input.display()))?;

    let listing = save_image(&batch, out, name)?;

    println!("Wrote {} image(s) to {}", batch.len(), out.display());
    for file in listing {
        println!("  {}", file);
    }

    Ok(())
}

fn parse_batch(content: &str) -> Result<Batch> {
    Ok(serde_json::from_str(content)?)
}
