use chrono::{NaiveDate, NaiveDateTime};
use modelvault_core::error::BoxError;
use modelvault_core::{MemoryStore, ModelArtifact, Registry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Tiny dense layer standing in for a framework model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Dense {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl Dense {
    fn sample() -> Self {
        Self {
            weights: vec![vec![0.5, -1.25, 2.0], vec![0.125, 3.0, -0.75]],
            bias: vec![0.25, -0.5],
        }
    }

    fn evaluate(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }
}

impl ModelArtifact for Dense {
    const EXTENSION: &'static str = "keras";

    fn save(&self, path: &Path) -> Result<(), BoxError> {
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self, BoxError> {
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }
}

fn stamp(month: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, month, 15)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn march() -> NaiveDateTime {
    stamp(3)
}

fn november() -> NaiveDateTime {
    stamp(11)
}

#[tokio::test]
async fn save_then_load_evaluates_identically() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::local(dir.path());
    registry.init().unwrap();

    let model = Dense::sample();
    let input = [1.0, 2.0, -4.0];
    let before = model.evaluate(&input);

    registry.save_model(&model).await.unwrap();
    let loaded = registry.load_model::<Dense>().await.unwrap().unwrap();

    assert_eq!(loaded.model.evaluate(&input), before);
    assert_eq!(loaded.model, model);
}

#[tokio::test]
async fn newest_of_several_saves_wins() {
    let dir = TempDir::new().unwrap();
    let older = Registry::local(dir.path()).with_clock(march);
    older.init().unwrap();
    older.save_model(&Dense::sample()).await.unwrap();

    let mut retrained = Dense::sample();
    retrained.bias = vec![10.0, 20.0];
    // Written first on disk order, but stamped later.
    let newer = Registry::local(dir.path()).with_clock(november);
    newer.save_model(&retrained).await.unwrap();

    let loaded = older.load_model::<Dense>().await.unwrap().unwrap();
    assert_eq!(loaded.model, retrained);
    assert_eq!(loaded.timestamp.unwrap().as_str(), "20241115-093000");
}

#[tokio::test]
async fn remote_round_trip_through_object_store() {
    let trainer_dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let trainer = Registry::remote(trainer_dir.path(), store.clone()).with_clock(march);
    trainer.init().unwrap();
    trainer.save_model(&Dense::sample()).await.unwrap();

    // A different machine with an empty local tree.
    let predictor_dir = TempDir::new().unwrap();
    let predictor = Registry::remote(predictor_dir.path(), store);
    let loaded = predictor.load_model::<Dense>().await.unwrap().unwrap();

    assert_eq!(loaded.model, Dense::sample());
    assert!(loaded.path.starts_with(predictor_dir.path()));
    assert!(loaded.path.ends_with("models/20240315-093000.keras"));
}
