// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Runs the full fine-tuning pipeline in order:
//
//   Step 1: Validate config, seed the backend      (Layer 2 / 5)
//   Step 2: Build the split loader (+ tokenizer)   (Layer 4 / 6)
//   Step 3: Load, coerce and validate the splits   (Layer 4)
//   Step 4: Save config, build the model           (Layer 6 / 5)
//   Step 5: Epoch loop with best-model selection   (Layer 2 / 5)
//   Step 6: Reload best weights, label test split  (Layer 5 / 6)
//
// Reference: Burn Book §5 (Training)

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::application::orchestrator::{Orchestrator, TrainingOutcome};
use crate::data::{
    dataset::PreparedSplit,
    loader::{SplitLoader, FEATURES_FILE, PAIRS_FILE},
    preprocessor::PairEncoder,
};
use crate::domain::traits::{EpochSession, SplitSource};
use crate::infra::{
    cancel::CancelToken,
    checkpoint::{load_weights, CheckpointManager},
    metrics::MetricsLogger,
    predictions::{write_predictions, PREDICTIONS_FILE},
    tokenizer_store::{self, TokenizerStore},
};
use crate::ml::{
    evaluator::predict_probabilities,
    model::{PairClassifier, PairClassifierConfig},
    session::BurnSession,
    threshold::DEFAULT_GRID_STEPS,
    EvalBackend, TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a run needs. Saved as train_config.json so `predict`
// can rebuild the same model and read the same splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:    String,
    pub output_dir:  String,
    pub train_split: String,
    pub valid_split: String,
    pub test_split:  String,
    pub label_key:   String,
    /// Where test-set labels are written
    pub predictions_file: String,
    pub tokenizer:    Option<String>,
    pub init_weights: Option<String>,

    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    pub dropout:     f64,
    pub num_classes: usize,

    pub batch_size:     usize,
    pub num_epochs:     usize,
    pub learning_rate:  f64,
    pub weight_decay:   f32,
    pub momentum:       f64,
    pub nesterov:       bool,
    pub grad_clip_norm: f32,
    pub grid_steps:     usize,
    pub seed:           u64,
    /// Run the trailing partial batch in training and validation too
    pub keep_trailing_batch: bool,
    pub lr_factor:   f64,
    pub lr_patience: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:         "data".to_string(),
            output_dir:       "checkpoints".to_string(),
            train_split:      "train".to_string(),
            valid_split:      "valid".to_string(),
            test_split:       "test".to_string(),
            label_key:        "sim".to_string(),
            predictions_file: PREDICTIONS_FILE.to_string(),
            tokenizer:        None,
            init_weights:     None,

            vocab_size:  30522,
            max_seq_len: 128,
            d_model:     256,
            num_heads:   8,
            num_layers:  6,
            d_ff:        1024,
            dropout:     0.1,
            num_classes: 2,

            batch_size:     128,
            num_epochs:     20,
            learning_rate:  5e-4,
            weight_decay:   1e-6,
            momentum:       0.9,
            nesterov:       true,
            grad_clip_norm: 2.0,
            grid_steps:     DEFAULT_GRID_STEPS,
            seed:           123456789,
            keep_trailing_batch: false,
            lr_factor:   0.1,
            lr_patience: 10,
        }
    }
}

impl TrainConfig {
    /// Reject settings that can only fail later. Zero epochs is allowed.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.num_classes < 2 {
            bail!("num_classes must be at least 2, got {}", self.num_classes);
        }
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            bail!("d_model ({}) must be divisible by num_heads ({})", self.d_model, self.num_heads);
        }
        if self.max_seq_len < 3 {
            bail!("max_seq_len must fit [CLS] and two [SEP] tokens, got {}", self.max_seq_len);
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if !(self.learning_rate > 0.0) {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        Ok(())
    }

    pub fn model_config(&self) -> PairClassifierConfig {
        PairClassifierConfig::new(
            self.vocab_size,
            self.max_seq_len,
            self.d_model,
            self.num_heads,
            self.num_layers,
            self.d_ff,
            self.dropout,
        )
        .with_num_classes(self.num_classes)
    }

    pub fn predictions_path(&self) -> PathBuf {
        PathBuf::from(&self.predictions_file)
    }
}

/// Build the loader for `cfg.data_dir`. A tokenizer is attached only
/// when some split is stored as raw text; `build_vocab` allows a new
/// word-level vocabulary to be built from the training pairs.
pub fn split_loader(cfg: &TrainConfig, build_vocab: bool) -> Result<SplitLoader> {
    let loader = SplitLoader::new(&cfg.data_dir, &cfg.label_key);

    let needs_tokenizer = [&cfg.train_split, &cfg.valid_split, &cfg.test_split]
        .iter()
        .any(|s| {
            let dir = loader.split_dir(s);
            !dir.join(FEATURES_FILE).exists() && dir.join(PAIRS_FILE).exists()
        });
    if !needs_tokenizer {
        return Ok(loader);
    }

    let tokenizer = match &cfg.tokenizer {
        Some(path) => tokenizer_store::load_from(Path::new(path))?,
        None if build_vocab => {
            let texts: Vec<String> = loader
                .read_pairs(&cfg.train_split)?
                .unwrap_or_default()
                .into_iter()
                .flat_map(|p| [p.text_a, p.text_b])
                .collect();
            TokenizerStore::new(&cfg.output_dir).load_or_build(&texts, cfg.vocab_size)?
        }
        None => TokenizerStore::new(&cfg.output_dir).load()?,
    };
    Ok(loader.with_encoder(PairEncoder::new(tokenizer, cfg.max_seq_len)))
}

/// Load one split, coerce it and check it fits the model's tables.
/// Labels are dropped when `labelled` is false.
pub fn prepare_split(
    source:   &impl SplitSource,
    cfg:      &TrainConfig,
    split:    &str,
    labelled: bool,
) -> Result<PreparedSplit> {
    let data = source.load_split(split)?;
    let name = &data.name;
    let labels = if labelled {
        Some(data.labels.as_ref().with_context(|| {
            format!("Split '{name}' has no '{}' labels", cfg.label_key)
        })?)
    } else {
        None
    };

    let prepared = PreparedSplit::prepare(&data.features, labels)
        .with_context(|| format!("Split '{name}' failed validation"))?;
    prepared
        .check_limits(cfg.vocab_size, cfg.max_seq_len, 2)
        .with_context(|| format!("Split '{name}' does not fit the model"))?;

    if let Some(labels) = &prepared.labels {
        if let Some(&bad) = labels.values().iter().find(|&&l| l < 0 || l as usize >= cfg.num_classes) {
            bail!("Split '{name}' has label {bad}, expected 0..{}", cfg.num_classes);
        }
    }

    tracing::info!("Split '{}': {} records, seq_len {}", name, prepared.num_records, prepared.seq_len());
    Ok(prepared)
}

/// Best weights → EvalBackend model → thresholded labels on disk.
pub fn label_split(
    cfg:        &TrainConfig,
    checkpoint: &Path,
    split:      &PreparedSplit,
    threshold:  f64,
    output:     &Path,
) -> Result<usize> {
    let device = Default::default();
    let model: PairClassifier<EvalBackend> = cfg.model_config().init(&device);
    let model  = load_weights(model, checkpoint, &device)?;

    let probs = predict_probabilities(&model, split, cfg.batch_size, &device)?;
    write_predictions(output, &probs, threshold)
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

/// What a finished (or cancelled) run produced.
#[derive(Debug)]
pub struct TrainSummary {
    pub outcome:     TrainingOutcome,
    pub predictions: PathBuf,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, cancel: CancelToken) -> Result<TrainSummary> {
        self.execute_with(cancel, |session| session)
    }

    /// `execute` with the epoch session passed through `wrap` before the
    /// orchestrator drives it.
    fn execute_with<S, F>(&self, cancel: CancelToken, wrap: F) -> Result<TrainSummary>
    where
        S: EpochSession,
        F: FnOnce(BurnSession<TrainBackend>) -> S,
    {
        let cfg = &self.config;

        // ── Step 1: Config and seed ─────────────────────────────────────────
        cfg.validate()?;
        TrainBackend::seed(cfg.seed);
        let device = Default::default();

        // ── Step 2: Loader ──────────────────────────────────────────────────
        let loader = split_loader(cfg, true)?;

        // ── Step 3: Splits ──────────────────────────────────────────────────
        // The test split goes through the same coercion and validation
        // now so a bad file fails before any training time is spent.
        let train = prepare_split(&loader, cfg, &cfg.train_split, true)?;
        let valid = prepare_split(&loader, cfg, &cfg.valid_split, true)?;
        let test  = prepare_split(&loader, cfg, &cfg.test_split, false)?;

        // ── Step 4: Config on disk, model ───────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.output_dir)?;
        checkpoints.save_config(cfg)?;

        let mut model: PairClassifier<TrainBackend> = cfg.model_config().init(&device);
        if let Some(path) = &cfg.init_weights {
            model = load_weights(model, Path::new(path), &device)
                .context("Cannot load the initial weights")?;
        }

        // ── Step 5: Epoch loop ──────────────────────────────────────────────
        let mut session = wrap(BurnSession::new(model, cfg, train, valid, checkpoints.clone(), device));
        let outcome = Orchestrator::new(cfg.num_epochs, cancel)
            .with_metrics(MetricsLogger::new(&cfg.output_dir)?)
            .with_checkpoints(checkpoints)
            .run(&mut session)?;

        // ── Step 6: Test inference with the best weights ────────────────────
        let Some(best) = &outcome.best else {
            bail!("No epoch finished validation, so there is no checkpoint to label '{}' with", cfg.test_split);
        };
        tracing::info!("Labelling '{}' with epoch {} weights", cfg.test_split, best.epoch);
        let predictions = cfg.predictions_path();
        label_split(cfg, &best.checkpoint, &test, best.threshold, &predictions)?;

        Ok(TrainSummary { outcome, predictions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::PAIRS_FILE;
    use crate::domain::error::DataError;
    use crate::domain::metrics::PhaseMetrics;
    use std::fs;

    #[test]
    fn test_default_matches_reference_run() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.batch_size, 128);
        assert_eq!(cfg.num_epochs, 20);
        assert_eq!(cfg.grid_steps, 100);
        assert_eq!(cfg.label_key, "sim");
        assert_eq!(cfg.predictions_file, PREDICTIONS_FILE);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let bad = [
            TrainConfig { batch_size: 0, ..TrainConfig::default() },
            TrainConfig { num_classes: 1, ..TrainConfig::default() },
            TrainConfig { num_heads: 3, ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err());
        }
        assert!(TrainConfig { num_epochs: 0, ..TrainConfig::default() }.validate().is_ok());
    }

    fn tiny(dir: &Path) -> TrainConfig {
        TrainConfig {
            data_dir:         dir.join("data").to_string_lossy().into_owned(),
            output_dir:       dir.join("out").to_string_lossy().into_owned(),
            predictions_file: dir.join("out/test_result.csv").to_string_lossy().into_owned(),
            vocab_size:  150,
            max_seq_len: 8,
            d_model:     8,
            num_heads:   2,
            num_layers:  1,
            d_ff:        16,
            dropout:     0.0,
            batch_size:  2,
            num_epochs:  2,
            learning_rate: 0.01,
            ..TrainConfig::default()
        }
    }

    fn write_split(cfg: &TrainConfig, split: &str, lines: &[&str]) {
        let dir = Path::new(&cfg.data_dir).join(split);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(PAIRS_FILE), lines.join("\n")).unwrap();
    }

    #[test]
    fn test_end_to_end_on_text_pairs() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny(tmp.path());
        let labelled = [
            "the cat sat\ta cat sat\t1",
            "the dog ran\ta bird flew\t0",
            "red apple\ta red apple\t1",
            "blue sky\tgreen grass\t0",
        ];
        write_split(&cfg, "train", &labelled);
        write_split(&cfg, "valid", &labelled);
        write_split(&cfg, "test", &["the cat\ta cat", "blue sky\tred apple", "dog\tbird"]);

        let summary = TrainUseCase::new(cfg.clone()).execute(CancelToken::new()).unwrap();
        assert_eq!(summary.outcome.epochs_completed, 2);
        assert!(summary.outcome.best.is_some());

        let csv = fs::read_to_string(&summary.predictions).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.lines().all(|l| l == "0" || l == "1"));

        let out = Path::new(&cfg.output_dir);
        assert!(out.join("train_config.json").exists());
        assert!(out.join("best_model.json").exists());
        assert!(out.join("tokenizer.json").exists());
        assert!(out.join("checkpoint_bert.mpk.gz").exists());
    }

    #[test]
    fn test_cancelled_before_training_has_no_best() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny(tmp.path());
        write_split(&cfg, "train", &["a\tb\t1", "c\td\t0"]);
        write_split(&cfg, "valid", &["a\tb\t1", "c\td\t0"]);
        write_split(&cfg, "test", &["a\tb"]);

        let token = CancelToken::new();
        token.cancel();
        assert!(TrainUseCase::new(cfg).execute(token).is_err());
    }

    #[test]
    fn test_label_count_mismatch_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny(tmp.path());
        let dir = Path::new(&cfg.data_dir).join("train");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(FEATURES_FILE),
            r#"{"input_id": [[101, 1, 102], [101, 1, 102]],
                "segment_id": [[0, 0, 0], [0, 0, 0]],
                "input_mask": [[1, 1, 1], [1, 1, 1]],
                "sim": [1]}"#,
        )
        .unwrap();

        let loader = split_loader(&cfg, true).unwrap();
        let err = prepare_split(&loader, &cfg, "train", true).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DataError>(),
            Some(&DataError::RecordCountMismatch { expected: 1, found: 2 })
        );
    }

    #[test]
    fn test_ids_past_vocab_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny(tmp.path());
        let dir = Path::new(&cfg.data_dir).join("train");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(FEATURES_FILE),
            r#"{"input_id": [[101, 500, 102]],
                "segment_id": [[0, 0, 0]],
                "input_mask": [[1, 1, 1]],
                "sim": [1]}"#,
        )
        .unwrap();

        let loader = split_loader(&cfg, true).unwrap();
        let err = prepare_split(&loader, &cfg, "train", true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::OutOfRange { value: 500, .. })
        ));
        assert!(format!("{err:#}").starts_with("Split 'train' does not fit the model"));
    }

    /// Real session that raises the cancel flag once a checkpoint is saved.
    struct CancelAfterSave {
        inner:  BurnSession<TrainBackend>,
        cancel: CancelToken,
    }

    impl EpochSession for CancelAfterSave {
        fn train_epoch(&mut self, epoch: usize) -> Result<PhaseMetrics> {
            self.inner.train_epoch(epoch)
        }

        fn validate_epoch(&mut self, epoch: usize) -> Result<PhaseMetrics> {
            self.inner.validate_epoch(epoch)
        }

        fn save_best(&mut self, epoch: usize) -> Result<PathBuf> {
            let path = self.inner.save_best(epoch)?;
            self.cancel.cancel();
            Ok(path)
        }

        fn learning_rate(&self) -> f64 {
            self.inner.learning_rate()
        }
    }

    #[test]
    fn test_cancel_after_first_checkpoint_labels_with_epoch_one() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { num_epochs: 3, ..tiny(tmp.path()) };
        let labelled = [
            "the cat sat\ta cat sat\t1",
            "the dog ran\ta bird flew\t0",
            "red apple\ta red apple\t1",
            "blue sky\tgreen grass\t0",
        ];
        write_split(&cfg, "train", &labelled);
        write_split(&cfg, "valid", &labelled);
        write_split(&cfg, "test", &["the cat\ta cat", "blue sky\tred apple", "dog\tbird"]);

        let token = CancelToken::new();
        let summary = TrainUseCase::new(cfg.clone())
            .execute_with(token.clone(), |inner| CancelAfterSave { inner, cancel: token.clone() })
            .unwrap();

        let outcome = &summary.outcome;
        assert!(outcome.cancelled);
        assert_eq!(outcome.epochs_completed, 1);
        let best = outcome.best.as_ref().unwrap();
        assert_eq!(best.epoch, 1);

        // The persisted best state is the one the test split was labelled with
        let manager = CheckpointManager::new(&cfg.output_dir).unwrap();
        let state = manager.load_best_state().unwrap();
        assert_eq!(state.epoch, 1);
        assert_eq!(state.threshold, best.threshold);

        let metrics = fs::read_to_string(Path::new(&cfg.output_dir).join("metrics.csv")).unwrap();
        assert_eq!(metrics.lines().count(), 2);

        let loader   = split_loader(&cfg, false).unwrap();
        let test     = prepare_split(&loader, &cfg, "test", false).unwrap();
        let expected = tmp.path().join("expected.csv");
        label_split(&cfg, &state.checkpoint, &test, state.threshold, &expected).unwrap();

        let written = fs::read_to_string(&summary.predictions).unwrap();
        assert_eq!(written.lines().count(), 3);
        assert_eq!(written, fs::read_to_string(&expected).unwrap());
    }
}
