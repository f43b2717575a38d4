// ============================================================
// Layer 5 - Evaluation Step
// ============================================================
// Validation and test inference share the training step's
// batching and accumulation but never build a gradient graph:
// callers pass the model on the inner backend (`model.valid()`),
// which also switches dropout off.
//
//   validate_epoch        labelled split, same batch convention
//                         as training → loss / acc / F1 / threshold
//   predict_probabilities unlabelled split, always includes the
//                         trailing partial batch → P(positive) per row

use anyhow::{bail, Result};
use burn::{nn::loss::CrossEntropyLoss, prelude::*, tensor::activation};

use crate::data::{
    batcher::ClassifierBatcher,
    batches::{BatchCount, BatchPlan},
    dataset::PreparedSplit,
};
use crate::domain::error::DataError;
use crate::domain::metrics::PhaseMetrics;
use crate::ml::accumulator::{positive_probabilities, BatchOutputs, PhaseAccumulator};
use crate::ml::model::PairClassifier;
use crate::ml::trainer::StepParams;

pub fn validate_epoch<B: Backend>(
    model:   &PairClassifier<B>,
    loss_fn: &CrossEntropyLoss<B>,
    split:   &PreparedSplit,
    params:  &StepParams,
    device:  &B::Device,
) -> Result<PhaseMetrics> {
    let Some(labels) = &split.labels else {
        bail!("The validation split has no labels");
    };
    let plan    = params.plan(split)?;
    let batcher = ClassifierBatcher::<B>::new(device.clone());
    let mut acc = PhaseAccumulator::new();

    for range in plan.iter() {
        let batch = batcher.batch(split, range.clone());
        let Some(targets) = batch.labels.clone() else {
            bail!("Validation batch built without labels");
        };

        let logits     = model.forward_batch(&batch);
        let batch_loss = loss_fn
            .forward(logits.clone(), targets.clone())
            .into_scalar()
            .elem::<f64>();

        let outputs = BatchOutputs::from_logits(logits, targets)?;
        acc.record(batch_loss, outputs, labels.records(range));
    }

    Ok(acc.finish(split.num_records, params.grid_steps)?)
}

/// Positive-class probability for every record of `split`, in order.
pub fn predict_probabilities<B: Backend>(
    model:      &PairClassifier<B>,
    split:      &PreparedSplit,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Vec<f32>> {
    let plan    = BatchPlan::new(split.num_records, batch_size, BatchCount::IncludeTrailing);
    let batcher = ClassifierBatcher::<B>::new(device.clone());

    let mut y_pred = Vec::with_capacity(split.num_records);
    for range in plan.iter() {
        let batch  = batcher.batch(split, range);
        let probs  = activation::softmax(model.forward_batch(&batch), 1);
        y_pred.extend(positive_probabilities(probs)?);
    }

    if y_pred.len() != split.num_records {
        return Err(DataError::ShapeMismatch {
            what:  "predictions vs test records",
            left:  y_pred.len(),
            right: split.num_records,
        }
        .into());
    }
    tracing::info!("Predicted {} records in {} batches", y_pred.len(), plan.num_batches());
    Ok(y_pred)
}
