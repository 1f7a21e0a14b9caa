// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Loads a finished training run and classifies one image:
//
//   Step 1: Open the run's output directory  (Layer 6 - infra)
//   Step 2: Rebuild the model + class map    (Layer 5 - ml)
//   Step 3: Rank the labels for the image    (Layer 5 - ml)

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase {
    inferencer: Inferencer,
}

impl PredictUseCase {
    pub fn new(model_dir: PathBuf) -> Result<Self> {
        if !model_dir.is_dir() {
            bail!("Model directory '{}' does not exist. Run 'train' first.", model_dir.display());
        }
        let ckpt_manager = CheckpointManager::new(model_dir)?;
        let device       = burn::backend::wgpu::WgpuDevice::default();
        let inferencer   = Inferencer::from_checkpoint(&ckpt_manager, device)?;
        Ok(Self { inferencer })
    }

    /// Every label the model can predict, sorted.
    pub fn labels(&self) -> &[String] {
        self.inferencer.classes().labels()
    }

    /// The `top_k` most likely labels with their probabilities.
    pub fn classify(&self, image: &std::path::Path, top_k: usize) -> Result<Vec<(String, f32)>> {
        self.inferencer.predict(image, top_k)
    }
}
