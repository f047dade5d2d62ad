//! Writing depth-plane predictions out as grayscale PNG files.

use image::GrayImage;
use std::fs;
use std::path::Path;

use crate::error::{RegistryError, Result};

pub const IMAGE_HEIGHT: u32 = 128;
pub const IMAGE_WIDTH: u32 = 256;
pub const IMAGE_SAMPLES: usize = (IMAGE_HEIGHT * IMAGE_WIDTH) as usize;

/// Write each prediction as `{name}_{index}.png` in `dir` and return the
/// sorted file names found in `dir` afterwards.
///
/// Each prediction is a flat, row-major buffer of exactly [`IMAGE_SAMPLES`]
/// values reshaped to 128 rows of 256 columns. Samples are cast to `u8`,
/// dropping the fractional part and saturating at 0 and 255. The whole batch
/// is checked before anything is written.
pub fn save_image<P: AsRef<[f32]>>(predictions: &[P], dir: &Path, name: &str) -> Result<Vec<String>> {
    for (index, prediction) in predictions.iter().enumerate() {
        let actual = prediction.as_ref().len();
        if actual != IMAGE_SAMPLES {
            return Err(RegistryError::Shape {
                index,
                expected: IMAGE_SAMPLES,
                actual,
            });
        }
    }

    for (index, prediction) in predictions.iter().enumerate() {
        let pixels: Vec<u8> = prediction.as_ref().iter().map(|&v| v as u8).collect();
        let img = GrayImage::from_raw(IMAGE_WIDTH, IMAGE_HEIGHT, pixels).ok_or(
            RegistryError::Shape {
                index,
                expected: IMAGE_SAMPLES,
                actual: prediction.as_ref().len(),
            },
        )?;

        let path = dir.join(format!("{}_{}.png", name, index));
        img.save_with_format(&path, image::ImageFormat::Png)?;
    }

    tracing::info!("Saved {} prediction image(s) to {}", predictions.len(), dir.display());
    list_dir(dir)
}

fn list_dir(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| RegistryError::io(dir, e))? {
        let entry = entry.map_err(|e| RegistryError::io(dir, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gradient() -> Vec<f32> {
        (0..IMAGE_SAMPLES).map(|i| (i % 256) as f32 + 0.9).collect()
    }

    #[test]
    fn writes_one_png_per_prediction() {
        let dir = TempDir::new().unwrap();
        let batch = vec![gradient(), vec![0.0; IMAGE_SAMPLES], vec![300.0; IMAGE_SAMPLES]];

        let listing = save_image(&batch, dir.path(), "pred").unwrap();

        assert_eq!(listing, vec!["pred_0.png", "pred_1.png", "pred_2.png"]);

        let img = image::open(dir.path().join("pred_0.png")).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (IMAGE_WIDTH, IMAGE_HEIGHT));
        assert_eq!(img.get_pixel(3, 0).0, [3]);
        assert_eq!(img.get_pixel(255, 127).0, [255]);

        let saturated = image::open(dir.path().join("pred_2.png")).unwrap().to_luma8();
        assert_eq!(saturated.get_pixel(0, 0).0, [255]);
    }

    #[test]
    fn listing_includes_existing_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a_note.txt"), b"x").unwrap();

        let listing = save_image(&[gradient()][..], dir.path(), "run").unwrap();
        assert_eq!(listing, vec!["a_note.txt", "run_0.png"]);
    }

    #[test]
    fn wrong_sample_count_is_a_shape_error() {
        let dir = TempDir::new().unwrap();
        let batch = vec![gradient(), vec![1.0; 100]];

        let err = save_image(&batch, dir.path(), "pred").unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Shape { index: 1, expected: IMAGE_SAMPLES, actual: 100 }
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_batch_only_lists() {
        let dir = TempDir::new().unwrap();
        let batch: Vec<Vec<f32>> = Vec::new();
        assert!(save_image(&batch, dir.path(), "pred").unwrap().is_empty());
    }
}
