// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Read worker count from NSLOTS   (Layer 6 - infra)
//   Step 2: Read the metadata CSV           (Layer 4 - data)
//   Step 3: Drop missing labels, split and
//           build the three generators      (Layer 4 - data)
//   Step 4: Save config for later runs      (Layer 6 - infra)
//   Step 5: Run training loop               (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    generator::{create_generators, GeneratorConfig, Generators},
    table::read_table,
};
use crate::infra::{checkpoint::CheckpointManager, workers::workers_from_env};
use crate::ml::{
    model::ArtworkClassifierConfig,
    trainer::{run_training, TrainingOutcome},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run.
// Serialisable so it can be saved next to the model and reloaded
// for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub csv_path:         PathBuf,
    pub images_dir:       PathBuf,
    pub output_dir:       PathBuf,
    /// Read only the first N rows of the CSV
    pub nrows:            Option<usize>,
    pub generator:        GeneratorConfig,
    pub epochs:           usize,
    pub learning_rate:    f64,
    /// torchvision vgg16 state dict for the frozen backbone
    pub backbone_weights: Option<PathBuf>,
    /// Seeds the train/test shuffle and the DataLoader order
    pub seed:             Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            csv_path:         PathBuf::from("data/db.csv"),
            images_dir:       PathBuf::from("data/images"),
            output_dir:       PathBuf::from("data"),
            nrows:            None,
            generator:        GeneratorConfig::default(),
            epochs:           16,
            learning_rate:    1e-3,
            backbone_weights: None,
            seed:             None,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Create a new TrainUseCase with the given configuration
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingOutcome> {
        let cfg = &self.config;

        // ── Step 1: Worker count ──────────────────────────────────────────────
        // Unset → 1; anything but a positive integer is an error
        let workers = workers_from_env()?;
        tracing::info!("Using {} image decode workers", workers);

        // ── Steps 2-3: Rows → generators ──────────────────────────────────────
        let generators = self.prepare_data()?;

        // ── Step 4: Save config ───────────────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.output_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 5: Run training loop (Layer 5) ───────────────────────────────
        let model_cfg = ArtworkClassifierConfig::new(generators.class_index.len());
        run_training(cfg, &model_cfg, &generators, workers, &ckpt_manager)
    }

    /// Read the CSV and build the train/validation/test generators.
    pub fn prepare_data(&self) -> Result<Generators> {
        let cfg = &self.config;

        tracing::info!("Reading dataset from '{}'", cfg.csv_path.display());
        let records = read_table(&cfg.csv_path, cfg.nrows)?;

        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };
        create_generators(records, &cfg.images_dir, &cfg.generator, &mut rng)
    }
}
