// ============================================================
// Layer 3 - Phase Metrics and Best-Model State
// ============================================================

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What one training or validation pass over a split produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    /// Mean cross-entropy per batch
    pub loss: f64,

    /// correct * 100 / num_records, in [0, 100]
    pub accuracy: f64,

    /// Pearson correlation between positive-class probability and label
    pub correlation: f64,

    /// Best F1 over the threshold grid
    pub f1: f64,

    /// First threshold reaching `f1`, in [0, 1]
    pub threshold: f64,
}

/// The validation result of the best epoch so far plus where its
/// weights were written. Saved next to the checkpoint as JSON so a
/// later `predict` run can reuse the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestModelState {
    pub epoch:      usize,
    pub f1:         f64,
    pub threshold:  f64,
    pub checkpoint: PathBuf,
}

impl BestModelState {
    /// Strictly-greater comparison; ties keep the earlier epoch.
    pub fn is_beaten_by(&self, f1: f64) -> bool {
        self.f1 < f1
    }
}

/// One finished epoch, as written to the metrics log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    pub epoch:         usize,
    pub train:         PhaseMetrics,
    pub valid:         PhaseMetrics,
    pub learning_rate: f64,
}
