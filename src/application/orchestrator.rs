// ============================================================
// Layer 2 - Training Orchestrator
// ============================================================
// Drives an EpochSession through the epoch loop:
//
//   for epoch in 1..=num_epochs:
//       cancelled? → stop
//       TrainEpoch
//       cancelled? → stop
//       ValidateEpoch
//       valid F1 > best F1 (or no best yet) → CheckpointIfBest
//
// The best epoch's F1, threshold and checkpoint path live in one
// `BestModelState`; the caller reloads the checkpoint from there
// for test inference, whether the loop ran out or was cancelled.

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::domain::metrics::{BestModelState, EpochReport};
use crate::domain::traits::EpochSession;
use crate::infra::{cancel::CancelToken, checkpoint::CheckpointManager, metrics::MetricsLogger};

/// What the loop body tells the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochSignal {
    Continue,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    /// `None` when no epoch finished validation
    pub best:             Option<BestModelState>,
    pub epochs_completed: usize,
    pub cancelled:        bool,
    pub elapsed:          Duration,
}

pub struct Orchestrator {
    num_epochs:  usize,
    cancel:      CancelToken,
    metrics:     Option<MetricsLogger>,
    checkpoints: Option<CheckpointManager>,
}

impl Orchestrator {
    pub fn new(num_epochs: usize, cancel: CancelToken) -> Self {
        Self { num_epochs, cancel, metrics: None, checkpoints: None }
    }

    /// Append every epoch's report to metrics.csv.
    pub fn with_metrics(mut self, metrics: MetricsLogger) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Write best_model.json whenever the best epoch changes.
    pub fn with_checkpoints(mut self, checkpoints: CheckpointManager) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    pub fn run<S: EpochSession>(&self, session: &mut S) -> Result<TrainingOutcome> {
        let start = Instant::now();
        let mut best      = None;
        let mut completed = 0;
        let mut cancelled = false;

        for epoch in 1..=self.num_epochs {
            match self.run_epoch(session, epoch, &mut best)? {
                EpochSignal::Continue  => completed = epoch,
                EpochSignal::Cancelled => {
                    cancelled = true;
                    break;
                }
            }
        }

        let elapsed = start.elapsed();
        if cancelled {
            println!("{}", "-".repeat(89));
            println!("Exiting from training early after {:.2}s", elapsed.as_secs_f64());
            tracing::warn!("Training cancelled after {} completed epochs", completed);
        }
        if let Some(b) = &best {
            tracing::info!("Best epoch {} | valid F1 {:.4} | threshold {:.2}", b.epoch, b.f1, b.threshold);
        }

        Ok(TrainingOutcome { best, epochs_completed: completed, cancelled, elapsed })
    }

    fn run_epoch<S: EpochSession>(
        &self,
        session: &mut S,
        epoch:   usize,
        best:    &mut Option<BestModelState>,
    ) -> Result<EpochSignal> {
        if self.cancel.is_cancelled() {
            return Ok(EpochSignal::Cancelled);
        }
        let epoch_start = Instant::now();
        let train = session.train_epoch(epoch)?;

        if self.cancel.is_cancelled() {
            return Ok(EpochSignal::Cancelled);
        }
        let valid = session.validate_epoch(epoch)?;

        let report = EpochReport { epoch, train, valid, learning_rate: session.learning_rate() };
        println!(
            "| epoch {:3} | {:6.2}s | train loss {:.4} acc {:6.2} F1 {:.4} \
             | valid loss {:.4} acc {:6.2} corr {:.4} F1 {:.4} thresh {:.2} | lr {:.2e}",
            epoch,
            epoch_start.elapsed().as_secs_f64(),
            train.loss, train.accuracy, train.f1,
            valid.loss, valid.accuracy, valid.correlation, valid.f1, valid.threshold,
            report.learning_rate,
        );
        if let Some(metrics) = &self.metrics {
            metrics.log(&report)?;
        }

        let improved = best.as_ref().map_or(true, |b| b.is_beaten_by(valid.f1));
        if improved {
            let checkpoint = session.save_best(epoch)?;
            let state = BestModelState { epoch, f1: valid.f1, threshold: valid.threshold, checkpoint };
            if let Some(checkpoints) = &self.checkpoints {
                checkpoints.save_best_state(&state)?;
            }
            tracing::info!("New best model at epoch {} (valid F1 {:.4})", epoch, valid.f1);
            *best = Some(state);
        }

        Ok(EpochSignal::Continue)
    }
}
