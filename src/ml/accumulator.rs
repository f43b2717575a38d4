use anyhow::{anyhow, Result};
use burn::{prelude::*, tensor::activation};

use crate::domain::error::DataError;
use crate::domain::metrics::PhaseMetrics;
use crate::ml::threshold::search_threshold;

/// Running totals for one phase. Predictions and labels are appended
/// in batch order and thrown away with the accumulator.
#[derive(Debug, Default)]
pub struct PhaseAccumulator {
    loss_sum: f64,
    batches:  usize,
    correct:  usize,
    y_true:   Vec<i64>,
    y_pred:   Vec<f32>,
}

impl PhaseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, loss: f64, outputs: BatchOutputs, labels: &[i64]) {
        self.loss_sum += loss;
        self.batches  += 1;
        self.correct  += outputs.correct;
        self.y_pred.extend(outputs.positive);
        self.y_true.extend_from_slice(labels);
    }

    /// Mean loss per batch, accuracy over *all* `num_records` (records in a
    /// dropped trailing batch count as misses), and the threshold search.
    pub fn finish(self, num_records: usize, grid_steps: usize) -> Result<PhaseMetrics, DataError> {
        if self.y_pred.len() != self.y_true.len() {
            return Err(DataError::ShapeMismatch {
                what:  "accumulated predictions vs labels",
                left:  self.y_pred.len(),
                right: self.y_true.len(),
            });
        }
        let search = search_threshold(&self.y_pred, &self.y_true, grid_steps)?;
        Ok(PhaseMetrics {
            loss:        self.loss_sum / self.batches as f64,
            accuracy:    self.correct as f64 * 100.0 / num_records as f64,
            correlation: search.correlation,
            f1:          search.best_f1,
            threshold:   search.threshold,
        })
    }
}

/// What one forward pass contributes to the accumulator.
#[derive(Debug, Clone)]
pub struct BatchOutputs {
    /// Pairs whose arg-max class equals the label
    pub correct:  usize,
    /// Softmax probability of class 1, one per pair
    pub positive: Vec<f32>,
}

impl BatchOutputs {
    pub fn from_logits<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> Result<Self> {
        let probs   = activation::softmax(logits, 1);
        let correct = probs
            .clone()
            .argmax(1)
            .flatten::<1>(0, 1)
            .equal(labels)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        Ok(Self {
            correct:  correct as usize,
            positive: positive_probabilities(probs)?,
        })
    }
}

/// Column 1 of a softmax output, copied to the host.
pub fn positive_probabilities<B: Backend>(probs: Tensor<B, 2>) -> Result<Vec<f32>> {
    let [batch_size, _] = probs.dims();
    probs
        .slice([0..batch_size, 1..2])
        .flatten::<1>(0, 1)
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read probabilities back: {e:?}"))
}
