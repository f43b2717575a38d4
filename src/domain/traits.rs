// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits:
//
//   SplitSource   → where a named split comes from
//                   (SplitLoader reads features.json / pairs.tsv)
//   EpochSession  → what one epoch of training / validation does
//                   (BurnSession drives a real model; tests use
//                    scripted sessions to exercise the orchestrator
//                    without a model)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::PathBuf;

use anyhow::Result;

use crate::domain::bundle::SplitData;
use crate::domain::metrics::PhaseMetrics;

// ─── SplitSource ──────────────────────────────────────────────────────────────
pub trait SplitSource {
    /// Load the Feature Bundle (and labels, when present) of `split`.
    fn load_split(&self, split: &str) -> Result<SplitData>;
}

// ─── EpochSession ─────────────────────────────────────────────────────────────
/// One training run's mutable state (model, optimizer, schedule),
/// driven one phase at a time by the orchestrator.
pub trait EpochSession {
    /// Run the Training Step over the training split.
    fn train_epoch(&mut self, epoch: usize) -> Result<PhaseMetrics>;

    /// Run the Evaluation Step over the validation split.
    fn validate_epoch(&mut self, epoch: usize) -> Result<PhaseMetrics>;

    /// Persist the current parameters as the best model; returns where.
    fn save_best(&mut self, epoch: usize) -> Result<PathBuf>;

    /// Learning rate the next optimizer step will use.
    fn learning_rate(&self) -> f64;
}
