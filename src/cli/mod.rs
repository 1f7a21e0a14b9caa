// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `build-csv` — fetches artwork metadata into a CSV
//   2. `train`     — trains the classifier on CSV + images
//   3. `predict`   — loads a trained model and labels an image
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BuildCsvArgs, Commands, PredictArgs, TrainArgs};
use std::path::Path;

use crate::infra::metrics::format_duration;
use crate::ml::trainer::TrainingOutcome;

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "artwork-classifier",
    version,
    about = "Build an artwork metadata CSV, train an image classifier on it, then predict."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::BuildCsv(args) => run_build_csv(args),
            Commands::Train(args)    => run_train(args),
            Commands::Predict(args)  => run_predict(args),
        }
    }
}

/// Handles the `build-csv` subcommand.
fn run_build_csv(args: BuildCsvArgs) -> Result<()> {
    use crate::application::build_csv_use_case::BuildCsvUseCase;

    let output = args.output.clone();
    let report = BuildCsvUseCase::new(args.into()).execute()?;

    println!(
        "Wrote {} of {} artworks to '{}' ({} skipped, {} duplicate images).",
        report.written, report.requested, output.display(), report.failed, report.duplicates
    );
    Ok(())
}

/// Handles the `train` subcommand.
/// Converts CLI args into a TrainConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.csv.display());
    let output_dir = args.output_dir.clone();

    // Convert CLI args → application config (separates presentation from domain)
    let outcome = TrainUseCase::new(args.into()).execute()?;

    println!("{}", training_summary(&outcome, &output_dir));
    Ok(())
}

/// What the user sees once a run has finished.
fn training_summary(outcome: &TrainingOutcome, output_dir: &Path) -> String {
    let mut lines = vec![format!(
        "Training complete: {} epochs in {}.",
        outcome.history.len(),
        format_duration(outcome.running_time)
    )];
    if let Some(best) = outcome.history.best() {
        lines.push(format!("Lowest validation loss {:.4} at epoch {}.", best.val_loss, best.epoch));
    }
    lines.push(format!(
        "Test loss {:.4}, test accuracy {:.1}%. Artifacts in '{}'.",
        outcome.test_score.loss,
        outcome.test_score.acc * 100.0,
        output_dir.display()
    ));
    lines.join("\n")
}

/// Handles the `predict` subcommand.
fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case = PredictUseCase::new(args.model_dir)?;
    let ranked   = use_case.classify(&args.image, args.top_k)?;

    println!("\n{} (top {} of {} labels)", args.image.display(), ranked.len(), use_case.labels().len());
    for (label, p) in ranked {
        println!("  {:<30} {:>6.2}%", label, p * 100.0);
    }
    Ok(())
}
