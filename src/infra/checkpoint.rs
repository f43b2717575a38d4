// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores the classifier with Burn's CompactRecorder.
//
// Files in the output directory:
//   checkpoint_bert.mpk.gz  ← weights of the best epoch so far
//                             (overwritten on every improvement)
//   best_model.json         ← epoch, F1 and threshold of that epoch
//   train_config.json       ← the TrainConfig the run was started with
//
// The recorder appends `.mpk.gz` itself, so paths handed to it and
// returned from here are extension-less stems.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::metrics::BestModelState;
use crate::ml::model::PairClassifier;

pub const CHECKPOINT_STEM: &str = "checkpoint_bert";
pub const BEST_STATE_FILE: &str = "best_model.json";
pub const CONFIG_FILE: &str = "train_config.json";

/// Strip a trailing `.mpk.gz` / `.mpk` so user-supplied weight paths
/// can be handed to the recorder.
pub fn record_stem(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    let stem = s
        .strip_suffix(".mpk.gz")
        .or_else(|| s.strip_suffix(".mpk"))
        .unwrap_or(&s);
    PathBuf::from(stem)
}

#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates `dir` (and parents) if it doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrite the best-model checkpoint; returns its stem path.
    pub fn save_model<B: Backend>(&self, model: &PairClassifier<B>) -> Result<PathBuf> {
        let path = self.dir.join(CHECKPOINT_STEM);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint to '{}'", path.display());
        Ok(path)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(CONFIG_FILE)
            .context("Make sure you have run 'train' before 'predict'")
    }

    pub fn save_best_state(&self, best: &BestModelState) -> Result<()> {
        self.write_json(BEST_STATE_FILE, best)
    }

    pub fn load_best_state(&self) -> Result<BestModelState> {
        self.read_json(BEST_STATE_FILE)
    }

    fn write_json<T: serde::Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.dir.join(file);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed '{}'", path.display()))
    }
}

/// Load a CompactRecorder file into `model`, independent of any output directory.
pub fn load_weights<B: Backend>(
    model:  PairClassifier<B>,
    path:   &Path,
    device: &B::Device,
) -> Result<PairClassifier<B>> {
    let stem   = record_stem(path);
    let record = CompactRecorder::new()
        .load(stem.clone(), device)
        .with_context(|| format!("Cannot load weights from '{}.mpk.gz'", stem.display()))?;
    tracing::info!("Loaded weights from '{}'", stem.display());
    Ok(model.load_record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_support::{tiny_config, toy_split};
    use crate::ml::evaluator::predict_probabilities;
    use burn::backend::NdArray;

    #[test]
    fn test_record_stem() {
        assert_eq!(record_stem(Path::new("out/checkpoint_bert.mpk.gz")), PathBuf::from("out/checkpoint_bert"));
        assert_eq!(record_stem(Path::new("w.mpk")), PathBuf::from("w"));
        assert_eq!(record_stem(Path::new("plain")), PathBuf::from("plain"));
    }

    #[test]
    fn test_save_and_load_model() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("nested/out")).unwrap();
        let device  = Default::default();

        let saved: PairClassifier<NdArray> = tiny_config().init(&device);
        let stem = manager.save_model(&saved).unwrap();
        assert_eq!(stem, manager.dir().join(CHECKPOINT_STEM));
        assert!(manager.dir().join("checkpoint_bert.mpk.gz").exists());

        let fresh: PairClassifier<NdArray> = tiny_config().init(&device);
        let loaded = load_weights(fresh, &stem, &device).unwrap();

        // Half-precision storage: compare predictions loosely.
        let split = toy_split(None);
        let a = predict_probabilities(&saved, &split, 4, &device).unwrap();
        let b = predict_probabilities(&loaded, &split, 4, &device).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-2);
        }
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let model: PairClassifier<NdArray> = tiny_config().init(&Default::default());
        assert!(load_weights(model, &dir.path().join("nope"), &Default::default()).is_err());
    }

    #[test]
    fn test_best_state_round_trip() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let best = BestModelState {
            epoch:      3,
            f1:         0.81,
            threshold:  0.42,
            checkpoint: manager.dir().join(CHECKPOINT_STEM),
        };
        manager.save_best_state(&best).unwrap();
        assert_eq!(manager.load_best_state().unwrap(), best);
        assert!(manager.load_config().is_err());
    }
}
