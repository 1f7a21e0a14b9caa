// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything a finished run leaves behind in
// the output directory:
//
//   model.mpk.gz        — classifier weights (CompactRecorder)
//   model_config.json   — ArtworkClassifierConfig, needed to
//                         rebuild the network before loading
//   classes.pkl         — pickled {label: index} dict
//   train_config.json   — the full run configuration
//
// The history and test-score text files are written by
// infra::metrics into the same directory.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Compresses with gzip for smaller file size
//   - Type-safe: loading fails if architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{anyhow, Context, Result};
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::label::ClassIndex;
use crate::ml::model::{ArtworkClassifier, ArtworkClassifierConfig};

/// Weights file stem; the recorder adds `.mpk.gz`
pub const MODEL_FILE: &str = "model";
pub const MODEL_CONFIG_FILE: &str = "model_config.json";
pub const CLASSES_FILE: &str = "classes.pkl";
pub const TRAIN_CONFIG_FILE: &str = "train_config.json";

/// Manages the artifacts of one output directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        // create_dir_all creates parent directories too, like `mkdir -p`
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights to {dir}/model.mpk.gz.
    pub fn save_model<B: Backend>(&self, model: &ArtworkClassifier<B>) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        tracing::info!("Saved model weights to '{}.mpk.gz'", path.display());
        Ok(())
    }

    /// Rebuild the network from model_config.json and load the saved weights.
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> Result<ArtworkClassifier<B>> {
        let model_cfg = self.load_model_config()?;
        let path      = self.dir.join(MODEL_FILE);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load model '{}'. Have you trained the model first?",
                    path.display())
            })?;

        // load_record() returns a new model with the loaded weights
        Ok(model_cfg.init::<B>(device).load_record(record))
    }

    pub fn save_model_config(&self, cfg: &ArtworkClassifierConfig) -> Result<()> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        cfg.save(&path)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_model_config(&self) -> Result<ArtworkClassifierConfig> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        ArtworkClassifierConfig::load(&path).with_context(|| {
            format!(
                "Cannot read model config from '{}'. \
                 Make sure you have run 'train' before 'predict'.",
                path.display()
            )
        })
    }

    /// Save the run configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(TRAIN_CONFIG_FILE);

        // serde_json::to_string_pretty adds indentation for readability
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(TRAIN_CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Pickle the label → index dict so Python tooling can read it too.
    pub fn save_class_index(&self, classes: &ClassIndex) -> Result<()> {
        let path = self.dir.join(CLASSES_FILE);
        let file = File::create(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        serde_pickle::to_writer(&mut BufWriter::new(file), classes.as_map(), serde_pickle::SerOptions::new())
            .with_context(|| format!("Cannot pickle class index to '{}'", path.display()))?;

        tracing::info!("Saved {} classes to '{}'", classes.len(), path.display());
        Ok(())
    }

    pub fn load_class_index(&self) -> Result<ClassIndex> {
        let path = self.dir.join(CLASSES_FILE);
        let file = File::open(&path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;
        let map: BTreeMap<String, usize> =
            serde_pickle::from_reader(BufReader::new(file), serde_pickle::DeOptions::new())
                .with_context(|| format!("Cannot unpickle '{}'", path.display()))?;
        ClassIndex::from_map(map)
            .ok_or_else(|| anyhow!("'{}' does not hold indices 0..n", path.display()))
    }
}
