// ============================================================
// Layer 5 - Training Step
// ============================================================
// One epoch over the training split, batch by batch in order:
//
//   forward → cross-entropy → backward → global grad-norm clip →
//   SGD step → softmax → correct count + P(positive) accumulated
//
// Key Burn insight:
//   - clipping happens between `from_grads` and `optim.step`, over
//     all parameters at once (see clipping.rs)
//   - `optim.step` consumes the model and hands back the updated
//     one, so the step threads the model through by value
//
// Reference: Burn Book §5, Sutskever et al. (2013) Nesterov momentum

use anyhow::{bail, Result};
use burn::{
    nn::loss::CrossEntropyLoss,
    optim::{decay::WeightDecayConfig, momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::ClassifierBatcher,
    batches::{BatchCount, BatchPlan},
    dataset::PreparedSplit,
};
use crate::domain::error::DataError;
use crate::domain::metrics::PhaseMetrics;
use crate::ml::accumulator::{BatchOutputs, PhaseAccumulator};
use crate::ml::clipping::clip_global_norm;
use crate::ml::model::PairClassifier;

/// Per-phase knobs shared by training and validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    pub batch_size:    usize,
    pub batches:       BatchCount,
    pub learning_rate: f64,
    pub grid_steps:    usize,
    /// Global gradient norm above which a step's gradients are rescaled
    pub grad_clip_norm: f64,
}

impl StepParams {
    pub fn from_config(cfg: &TrainConfig) -> Self {
        let batches = if cfg.keep_trailing_batch {
            BatchCount::IncludeTrailing
        } else {
            BatchCount::DropTrailing
        };
        Self {
            batch_size: cfg.batch_size,
            batches,
            learning_rate: cfg.learning_rate,
            grid_steps: cfg.grid_steps,
            grad_clip_norm: cfg.grad_clip_norm.into(),
        }
    }

    pub fn plan(&self, split: &PreparedSplit) -> Result<BatchPlan, DataError> {
        let plan = BatchPlan::new(split.num_records, self.batch_size, self.batches);
        if plan.num_batches() == 0 {
            return Err(DataError::NoBatches {
                num_records: split.num_records,
                batch_size:  self.batch_size,
            });
        }
        Ok(plan)
    }
}

/// SGD with Nesterov momentum and L2 weight decay. Clipping is done by
/// [`clip_global_norm`] before each step.
pub fn sgd_config(cfg: &TrainConfig) -> SgdConfig {
    let momentum = MomentumConfig::new()
        .with_momentum(cfg.momentum)
        .with_dampening(0.0)
        .with_nesterov(cfg.nesterov);

    SgdConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(cfg.weight_decay.into())))
        .with_momentum(Some(momentum))
}

/// Run one training epoch. Returns the updated model and the epoch's metrics.
pub fn train_epoch<B, O>(
    mut model: PairClassifier<B>,
    optim:     &mut O,
    loss_fn:   &CrossEntropyLoss<B>,
    split:     &PreparedSplit,
    params:    &StepParams,
    device:    &B::Device,
) -> Result<(PairClassifier<B>, PhaseMetrics)>
where
    B: AutodiffBackend,
    O: Optimizer<PairClassifier<B>, B>,
{
    let Some(labels) = &split.labels else {
        bail!("The training split has no labels");
    };
    let plan    = params.plan(split)?;
    let batcher = ClassifierBatcher::<B>::new(device.clone());
    let mut acc = PhaseAccumulator::new();

    tracing::info!("Training on {} records in {} batches", plan.num_records(), plan.num_batches());

    for (index, range) in plan.iter().enumerate() {
        let batch   = batcher.batch(split, range.clone());
        let Some(targets) = batch.labels.clone() else {
            bail!("Batch {index} was built without labels");
        };

        let logits = model.forward_batch(&batch);
        let loss   = loss_fn.forward(logits.clone(), targets.clone());

        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        tracing::debug!("batch {:>4} | batch_loss={:.6}", index, loss_val);

        let grads = loss.backward();
        let mut grads = GradientsParams::from_grads(grads, &model);
        let grad_norm = clip_global_norm(&model, &mut grads, params.grad_clip_norm);
        tracing::trace!("batch {:>4} | grad_norm={:.6}", index, grad_norm);
        model = optim.step(params.learning_rate, model, grads);

        let outputs = BatchOutputs::from_logits(logits.detach(), targets)?;
        acc.record(loss_val, outputs, labels.records(range));
    }

    let metrics = acc.finish(split.num_records, params.grid_steps)?;
    Ok((model, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_support::{tiny_config, toy_split, AdBackend};
    use burn::nn::loss::CrossEntropyLossConfig;

    fn params(batches: BatchCount) -> StepParams {
        StepParams { batch_size: 2, batches, learning_rate: 0.01, grid_steps: 100, grad_clip_norm: 2.0 }
    }

    #[test]
    fn test_one_epoch_on_toy_data() {
        let device = Default::default();
        let model: PairClassifier<AdBackend> = tiny_config().init(&device);
        let cfg       = TrainConfig::default();
        let mut optim = sgd_config(&cfg).init::<AdBackend, PairClassifier<AdBackend>>();
        let loss_fn   = CrossEntropyLossConfig::new().init(&device);
        let split     = toy_split(Some(vec![0, 1, 1, 0]));

        let (_, m) = train_epoch(model, &mut optim, &loss_fn, &split, &params(BatchCount::DropTrailing), &device)
            .unwrap();

        assert!(m.loss.is_finite());
        assert!((0.0..=100.0).contains(&m.accuracy));
        assert!((0.0..=1.0).contains(&m.threshold));
        assert!((0.0..=1.0).contains(&m.f1));
    }

    #[test]
    fn test_unlabelled_split_cannot_train() {
        let device = Default::default();
        let model: PairClassifier<AdBackend> = tiny_config().init(&device);
        let mut optim = sgd_config(&TrainConfig::default()).init::<AdBackend, PairClassifier<AdBackend>>();
        let loss_fn   = CrossEntropyLossConfig::new().init(&device);

        let result = train_epoch(model, &mut optim, &loss_fn, &toy_split(None), &params(BatchCount::IncludeTrailing), &device);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_batches_is_an_error() {
        let split = toy_split(Some(vec![0, 1, 1, 0]));
        let p = StepParams { batch_size: 8, ..params(BatchCount::DropTrailing) };
        assert_eq!(
            p.plan(&split).unwrap_err(),
            DataError::NoBatches { num_records: 4, batch_size: 8 }
        );
    }
}
