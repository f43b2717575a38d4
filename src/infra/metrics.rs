// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Appends one CSV row per finished epoch so learning curves can
// be plotted after (or during) a run.
//
// Output file: <output_dir>/metrics.csv
//
//   epoch,train_loss,train_acc,train_f1,train_threshold,valid_loss,valid_acc,valid_corr,valid_f1,valid_threshold,lr
//   1,0.693100,51.200000,0.667000,0.000000,0.690200,52.000000,0.084000,0.671000,0.450000,5.000e-4
//
// How to read the metrics:
//   - valid_loss rising while train_loss falls → overfitting
//   - valid_f1 is what selects the checkpoint
//   - lr drops by the plateau factor when valid_loss stalls
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use anyhow::{Context, Result};

use crate::domain::metrics::EpochReport;

pub const METRICS_FILE: &str = "metrics.csv";

const HEADER: &str = "epoch,train_loss,train_acc,train_f1,train_threshold,\
valid_loss,valid_acc,valid_corr,valid_f1,valid_threshold,lr";

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header only when the file is new, so reruns append.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join(METRICS_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, r: &EpochReport) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.3e}",
            r.epoch,
            r.train.loss,
            r.train.accuracy,
            r.train.f1,
            r.train.threshold,
            r.valid.loss,
            r.valid.accuracy,
            r.valid.correlation,
            r.valid.f1,
            r.valid.threshold,
            r.learning_rate,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, valid_loss={:.4}",
            r.epoch,
            r.train.loss,
            r.valid.loss,
        );
        Ok(())
    }
}
