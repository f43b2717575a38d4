// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2. Printing the
// final summary is the only thing done here.
//
//   1. `train`   - fine-tune, keep the best epoch, label the test split
//   2. `predict` - relabel a split with a finished run's checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

use crate::application::{predict_use_case::PredictUseCase, train_use_case::TrainUseCase};
use crate::infra::cancel::CancelToken;

#[derive(Parser, Debug)]
#[command(
    name = "pair-classifier",
    version,
    about = "Fine-tune a transformer sentence-pair classifier and label a test split."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on splits in: {}", args.data_dir);

    let cancel = CancelToken::new();
    cancel.install_ctrlc_handler()?;

    let summary = TrainUseCase::new(args.into()).execute(cancel)?;
    let outcome = &summary.outcome;
    if let Some(best) = &outcome.best {
        println!(
            "Training {} after {} epochs ({:.1}s). Best epoch {}: valid F1 {:.4} at threshold {:.2}.",
            if outcome.cancelled { "stopped" } else { "complete" },
            outcome.epochs_completed,
            outcome.elapsed.as_secs_f64(),
            best.epoch,
            best.f1,
            best.threshold,
        );
    }
    println!("Test predictions written to '{}'.", summary.predictions.display());
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let summary = PredictUseCase::new(&args.output_dir)
        .with_split(args.split)
        .with_data_dir(args.data_dir)
        .with_output(args.output)
        .execute()?;

    println!(
        "Labelled {} records at threshold {:.2} → '{}'.",
        summary.records,
        summary.threshold,
        summary.output.display()
    );
    Ok(())
}
