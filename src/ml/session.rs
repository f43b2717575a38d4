// ============================================================
// Layer 5 - Burn Training Session
// ============================================================
// Owns everything one training run mutates: the model, the SGD
// optimizer state, the plateau schedule, and the two prepared
// splits. The orchestrator drives it through `EpochSession`
// and never sees a tensor.
//
//   train_epoch    → trainer::train_epoch on the autodiff model
//   validate_epoch → evaluator::validate_epoch on model.valid(),
//                    then the schedule is stepped with the loss
//   save_best      → CheckpointManager overwrites checkpoint_bert

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use burn::{
    module::AutodiffModule,
    nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig},
    optim::{adaptor::OptimizerAdaptor, Sgd},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::dataset::PreparedSplit;
use crate::domain::metrics::PhaseMetrics;
use crate::domain::traits::EpochSession;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    evaluator,
    model::PairClassifier,
    schedule::ReduceLrOnPlateau,
    trainer::{self, sgd_config, StepParams},
};

type SgdOptimizer<B> = OptimizerAdaptor<Sgd<<B as AutodiffBackend>::InnerBackend>, PairClassifier<B>, B>;

pub struct BurnSession<B: AutodiffBackend> {
    /// `None` only while an epoch has temporarily moved the model out.
    model:       Option<PairClassifier<B>>,
    optim:       SgdOptimizer<B>,
    loss_fn:     CrossEntropyLoss<B>,
    valid_loss:  CrossEntropyLoss<B::InnerBackend>,
    train:       PreparedSplit,
    valid:       PreparedSplit,
    params:      StepParams,
    schedule:    ReduceLrOnPlateau,
    checkpoints: CheckpointManager,
    device:      B::Device,
}

impl<B: AutodiffBackend> BurnSession<B> {
    pub fn new(
        model:       PairClassifier<B>,
        cfg:         &TrainConfig,
        train:       PreparedSplit,
        valid:       PreparedSplit,
        checkpoints: CheckpointManager,
        device:      B::Device,
    ) -> Self {
        let optim = sgd_config(cfg).init::<B, PairClassifier<B>>();
        Self {
            model: Some(model),
            optim,
            loss_fn:    CrossEntropyLossConfig::new().init(&device),
            valid_loss: CrossEntropyLossConfig::new().init(&device),
            train,
            valid,
            params:   StepParams::from_config(cfg),
            schedule: ReduceLrOnPlateau::new(cfg.learning_rate, cfg.lr_factor, cfg.lr_patience),
            checkpoints,
            device,
        }
    }

    fn model(&self) -> Result<&PairClassifier<B>> {
        self.model.as_ref().ok_or_else(|| anyhow!("Model lost during a failed epoch"))
    }
}

impl<B: AutodiffBackend> EpochSession for BurnSession<B> {
    fn train_epoch(&mut self, _epoch: usize) -> Result<PhaseMetrics> {
        let model = self
            .model
            .take()
            .ok_or_else(|| anyhow!("Model lost during a failed epoch"))?;
        let params = StepParams { learning_rate: self.schedule.lr(), ..self.params };

        let (model, metrics) =
            trainer::train_epoch(model, &mut self.optim, &self.loss_fn, &self.train, &params, &self.device)?;
        self.model = Some(model);
        Ok(metrics)
    }

    fn validate_epoch(&mut self, _epoch: usize) -> Result<PhaseMetrics> {
        let model   = self.model()?.valid();
        let metrics = evaluator::validate_epoch(&model, &self.valid_loss, &self.valid, &self.params, &self.device)?;
        self.schedule.step(metrics.loss);
        Ok(metrics)
    }

    fn save_best(&mut self, _epoch: usize) -> Result<PathBuf> {
        self.checkpoints.save_model(self.model()?)
    }

    fn learning_rate(&self) -> f64 {
        self.schedule.lr()
    }
}
