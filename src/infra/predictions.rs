// ============================================================
// Layer 6 - Prediction Writer
// ============================================================
// test_result.csv holds one hard label per test record, in input
// order, no header:
//
//   1
//   0
//   ...
//
// A record is positive when its probability is strictly above the
// threshold picked on the validation split.

use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};

pub const PREDICTIONS_FILE: &str = "test_result.csv";

pub fn hard_labels(probabilities: &[f32], threshold: f64) -> Vec<u8> {
    probabilities
        .iter()
        .map(|&p| u8::from(f64::from(p) > threshold))
        .collect()
}

/// Write the thresholded labels to `path`, replacing any previous file.
pub fn write_predictions(path: &Path, probabilities: &[f32], threshold: f64) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    let mut out = BufWriter::new(file);

    let labels = hard_labels(probabilities, threshold);
    for label in &labels {
        writeln!(out, "{label}")?;
    }
    out.flush()?;

    let positives = labels.iter().filter(|&&l| l == 1).count();
    tracing::info!(
        "Wrote {} predictions ({} positive) to '{}'",
        labels.len(),
        positives,
        path.display()
    );
    Ok(labels.len())
}
