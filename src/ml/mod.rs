// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// Everything that touches Burn tensors and modules lives here.
// The data layer hands over host-side `PreparedSplit`s; this
// layer batches them onto the device, runs the model and hands
// back plain `PhaseMetrics`.
//
//   model.rs       - BERT-style encoder with a pair-classification head
//   trainer.rs     - Training Step: one epoch of SGD over a split
//   clipping.rs    - global gradient-norm clipping before each step
//   evaluator.rs   - Evaluation Step and test-set probabilities
//   accumulator.rs - per-phase loss / correct / probability totals
//   threshold.rs   - Pearson correlation + F1 threshold search
//   schedule.rs    - reduce-on-plateau learning rate
//   session.rs     - BurnSession: the EpochSession the orchestrator drives
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Devlin et al. (2019) BERT

use burn::backend::{Autodiff, NdArray};

/// Backend the Training Step differentiates through.
pub type TrainBackend = Autodiff<NdArray>;

/// Gradient-free backend for validation and prediction.
pub type EvalBackend = NdArray;

pub mod model;
pub mod trainer;
pub mod clipping;
pub mod evaluator;
pub mod accumulator;
pub mod threshold;
pub mod schedule;
pub mod session;

#[cfg(test)]
pub mod test_support;
