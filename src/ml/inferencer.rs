// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Loads a finished run from its output directory and ranks the
// classes for a single image. The image goes through the same
// resize + rescale as the test split (no augmentation).
use std::path::Path;

use anyhow::{anyhow, Result};
use burn::{prelude::*, tensor::TensorData};

use crate::data::{augment::AugmentationPolicy, batcher::load_image};
use crate::domain::label::ClassIndex;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::ArtworkClassifier;

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend = InferBackend> {
    model:      ArtworkClassifier<B>,
    classes:    ClassIndex,
    image_size: (u32, u32),
    policy:     AugmentationPolicy,
    device:     B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg     = ckpt_manager.load_config()?;
        let classes = ckpt_manager.load_class_index()?;
        let model   = ckpt_manager.load_model::<B>(&device)?;

        if model.num_classes() != classes.len() {
            return Err(anyhow!(
                "Model predicts {} classes but '{}' lists {}",
                model.num_classes(),
                ckpt_manager.dir().display(),
                classes.len()
            ));
        }
        tracing::info!("Model loaded from checkpoint ({} classes)", classes.len());

        Ok(Self {
            model,
            classes,
            image_size: cfg.generator.image_size,
            policy:     cfg.generator.test_policy,
            device,
        })
    }

    pub fn classes(&self) -> &ClassIndex {
        &self.classes
    }

    /// Probabilities of the `top_k` most likely labels, best first.
    pub fn predict(&self, image: &Path, top_k: usize) -> Result<Vec<(String, f32)>> {
        let img    = load_image(image, self.image_size)?;
        let pixels = self.policy.to_chw(&img);
        let (w, h) = self.image_size;

        let input = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [1, 3, h as usize, w as usize]),
            &self.device,
        );
        let probs: Vec<f32> = self
            .model
            .predict_proba(input)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read probabilities: {e:?}"))?;

        let mut ranked: Vec<(usize, f32)> = probs.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let top = ranked
            .into_iter()
            .take(top_k.max(1))
            .filter_map(|(i, p)| self.classes.label_of(i).map(|l| (l.to_string(), p)))
            .collect::<Vec<_>>();

        tracing::debug!("Prediction for '{}': {:?}", image.display(), top);
        Ok(top)
    }
}
