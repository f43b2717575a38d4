// ============================================================
// Layer 2 - PredictUseCase
// ============================================================
// Relabels a split with a finished run's best checkpoint:
//
//   train_config.json → model architecture, data layout
//   best_model.json   → decision threshold
//   checkpoint_bert   → weights
//
// Nothing is trained; the split only needs feature columns.

use std::path::PathBuf;

use anyhow::Result;

use crate::application::train_use_case::{label_split, prepare_split, split_loader};
use crate::infra::checkpoint::{CheckpointManager, CHECKPOINT_STEM};

pub struct PredictUseCase {
    output_dir: PathBuf,
    split:      Option<String>,
    data_dir:   Option<String>,
    output:     Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictSummary {
    pub records:   usize,
    pub threshold: f64,
    pub output:    PathBuf,
}

impl PredictUseCase {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into(), split: None, data_dir: None, output: None }
    }

    /// Split to label instead of the run's test split.
    pub fn with_split(mut self, split: Option<String>) -> Self {
        self.split = split;
        self
    }

    /// Read splits from here instead of the run's data directory.
    pub fn with_data_dir(mut self, data_dir: Option<String>) -> Self {
        self.data_dir = data_dir;
        self
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn execute(&self) -> Result<PredictSummary> {
        let checkpoints = CheckpointManager::new(&self.output_dir)?;
        let mut cfg = checkpoints.load_config()?;
        if let Some(dir) = &self.data_dir {
            cfg.data_dir = dir.clone();
        }
        let best = checkpoints.load_best_state()?;
        let split_name = self.split.clone().unwrap_or_else(|| cfg.test_split.clone());
        tracing::info!(
            "Using epoch {} weights (valid F1 {:.4}, threshold {:.2})",
            best.epoch,
            best.f1,
            best.threshold
        );

        let loader = split_loader(&cfg, false)?;
        let split  = prepare_split(&loader, &cfg, &split_name, false)?;

        let output  = self.output.clone().unwrap_or_else(|| cfg.predictions_path());
        let records = label_split(
            &cfg,
            &checkpoints.dir().join(CHECKPOINT_STEM),
            &split,
            best.threshold,
            &output,
        )?;

        Ok(PredictSummary { records, threshold: best.threshold, output })
    }
}
