// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Two subcommands, `train` and `predict`. Defaults reproduce the
// reference fine-tuning run (batch 128, 20 epochs, SGD 5e-4 with
// Nesterov momentum 0.9, clip 2.0, seed 123456789).
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the pair classifier and label the test split
    Train(TrainArgs),

    /// Label a split with the best checkpoint of a finished run
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding one sub-directory per split
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Where checkpoints, configs, metrics and the tokenizer go
    #[arg(long, default_value = "checkpoints")]
    pub output_dir: String,

    #[arg(long, default_value = "train")]
    pub train_split: String,

    #[arg(long, default_value = "valid")]
    pub valid_split: String,

    #[arg(long, default_value = "test")]
    pub test_split: String,

    /// Label column in features.json
    #[arg(long, default_value = "sim")]
    pub label_key: String,

    /// CSV the test-split labels are written to
    #[arg(long, default_value = "test_result.csv")]
    pub predictions_file: String,

    /// HuggingFace tokenizer.json for pairs.tsv splits
    /// (default: build a word-level vocabulary from the training pairs)
    #[arg(long)]
    pub tokenizer: Option<String>,

    /// Burn record (.mpk.gz) to start from instead of random weights
    #[arg(long)]
    pub init_weights: Option<String>,

    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Padded length of every [CLS] a [SEP] b [SEP] row
    #[arg(long, default_value_t = 128)]
    pub max_seq_len: usize,

    /// Hidden size; must be divisible by --num-heads
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    #[arg(long, default_value_t = 2)]
    pub num_classes: usize,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 20)]
    pub num_epochs: usize,

    #[arg(long, default_value_t = 5e-4)]
    pub learning_rate: f64,

    /// L2 penalty added to every gradient
    #[arg(long, default_value_t = 1e-6)]
    pub weight_decay: f32,

    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// Use classical momentum instead of Nesterov
    #[arg(long)]
    pub no_nesterov: bool,

    /// Gradient norm above which gradients are rescaled
    #[arg(long, default_value_t = 2.0)]
    pub grad_clip_norm: f32,

    /// Thresholds tried are 0, 1/n, ..., 1
    #[arg(long, default_value_t = 100)]
    pub grid_steps: usize,

    #[arg(long, default_value_t = 123456789)]
    pub seed: u64,

    /// Also run the last partial batch during training and validation
    #[arg(long)]
    pub keep_trailing_batch: bool,

    /// Learning-rate multiplier when validation loss plateaus
    #[arg(long, default_value_t = 0.1)]
    pub lr_factor: f64,

    /// Epochs without improvement before the rate is reduced
    #[arg(long, default_value_t = 10)]
    pub lr_patience: usize,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:         a.data_dir,
            output_dir:       a.output_dir,
            train_split:      a.train_split,
            valid_split:      a.valid_split,
            test_split:       a.test_split,
            label_key:        a.label_key,
            predictions_file: a.predictions_file,
            tokenizer:        a.tokenizer,
            init_weights:     a.init_weights,
            vocab_size:       a.vocab_size,
            max_seq_len:      a.max_seq_len,
            d_model:          a.d_model,
            num_heads:        a.num_heads,
            num_layers:       a.num_layers,
            d_ff:             a.d_ff,
            dropout:          a.dropout,
            num_classes:      a.num_classes,
            batch_size:       a.batch_size,
            num_epochs:       a.num_epochs,
            learning_rate:    a.learning_rate,
            weight_decay:     a.weight_decay,
            momentum:         a.momentum,
            nesterov:         !a.no_nesterov,
            grad_clip_norm:   a.grad_clip_norm,
            grid_steps:       a.grid_steps,
            seed:             a.seed,
            keep_trailing_batch: a.keep_trailing_batch,
            lr_factor:        a.lr_factor,
            lr_patience:      a.lr_patience,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Output directory of the training run
    #[arg(long, default_value = "checkpoints")]
    pub output_dir: String,

    /// Split to label (default: the run's test split)
    #[arg(long)]
    pub split: Option<String>,

    /// Read splits from here instead of the run's data directory
    #[arg(long)]
    pub data_dir: Option<String>,

    /// CSV to write (default: the run's predictions file)
    #[arg(long)]
    pub output: Option<PathBuf>,
}
