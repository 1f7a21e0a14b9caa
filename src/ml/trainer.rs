// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fixed-epoch train + validation loop using Burn's DataLoader
// and Adam, followed by a single evaluation on the test split.
//
// Key Burn insight:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns model on MyInnerBackend (Wgpu)
//   - Validation/test loaders must also use MyInnerBackend
//   - argmax(1) returns [batch,1] so we flatten before .equal()
//
// Losses and accuracies are averaged per SAMPLE, not per batch,
// so a short final batch does not skew the epoch figures.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ImageBatch, generator::Generators};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{format_duration, write_history, write_test_score, EpochMetrics, TestScore, TrainingHistory},
};
use crate::ml::model::{ArtworkClassifier, ArtworkClassifierConfig};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Default DataLoader shuffle seed when the run is not seeded.
const DEFAULT_SHUFFLE_SEED: u64 = 42;

/// What a finished run produced, besides the files on disk.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub history:      TrainingHistory,
    pub test_score:   TestScore,
    pub running_time: Duration,
}

pub fn run_training(
    cfg:          &TrainConfig,
    model_cfg:    &ArtworkClassifierConfig,
    generators:   &Generators,
    workers:      usize,
    ckpt_manager: &CheckpointManager,
) -> Result<TrainingOutcome> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, model_cfg, generators, workers, ckpt_manager, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    model_cfg:    &ArtworkClassifierConfig,
    generators:   &Generators,
    workers:      usize,
    ckpt_manager: &CheckpointManager,
    device:       B::Device,
) -> Result<TrainingOutcome> {
    if generators.train.is_empty() {
        bail!("The training split has no images; check the image directory");
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: ArtworkClassifier<B> = match &cfg.backbone_weights {
        Some(path) => model_cfg.init_pretrained(path, &device)?,
        None => {
            tracing::warn!(
                "No --backbone-weights given: the frozen backbone keeps its random initialisation"
            );
            model_cfg.init(&device)
        }
    };
    tracing::info!(
        "Model ready: {} conv stages, head {:?} → {} classes",
        model_cfg.backbone.stages.len(),
        model_cfg.hidden_sizes,
        model_cfg.num_classes,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    // Frozen backbone params have no gradients and are left alone.
    let optim_cfg = AdamConfig::new().with_epsilon(1e-7);
    let mut optim = optim_cfg.init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    // Training batches carry autodiff tensors; validation and test
    // batches live on the inner backend (no autodiff overhead).
    let seed         = cfg.seed.unwrap_or(DEFAULT_SHUFFLE_SEED);
    let train_loader = generators.train.loader::<B>(device.clone(), workers, Some(seed));
    let val_loader   = generators
        .validation
        .loader::<B::InnerBackend>(device.clone(), workers, None);
    let test_loader  = generators
        .test
        .loader::<B::InnerBackend>(device.clone(), workers, None);

    tracing::info!(
        "Steps per epoch: {} training, {} validation",
        generators.train.len(),
        generators.validation.len(),
    );

    let started     = Instant::now();
    let mut history = TrainingHistory::default();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut running = Running::default();

        for batch in train_loader.iter() {
            let samples = batch.labels.dims()[0];
            let (loss, logits) = model.forward_loss(batch.images, batch.labels.clone());

            running.add(
                loss.clone().into_scalar().elem::<f64>(),
                count_correct(logits, batch.labels),
                samples,
            );

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let val = evaluate(&model_valid, val_loader.as_ref());

        let metrics = EpochMetrics {
            epoch,
            train_acc:  running.accuracy(),
            val_acc:    val.acc,
            train_loss: running.loss(),
            val_loss:   val.loss,
        };

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | train_acc={:.1}% | val_loss={:.4} | val_acc={:.1}%",
            epoch, cfg.epochs, metrics.train_loss, metrics.train_acc * 100.0,
            metrics.val_loss, metrics.val_acc * 100.0,
        );
        tracing::debug!(?metrics, "epoch finished");
        history.push(metrics);
    }

    if let Some(best) = history.best() {
        tracing::info!("Lowest validation loss {:.4} at epoch {}", best.val_loss, best.epoch);
    }
    let running_time = started.elapsed();
    tracing::info!("Running time: {}", format_duration(running_time));
    write_history(ckpt_manager.dir(), &history, running_time)?;

    // ── Final evaluation on held-out data ─────────────────────────────────────
    let model_valid = model.valid();
    let test_score  = evaluate(&model_valid, test_loader.as_ref());
    tracing::info!("Test loss: {:.4}, test accuracy: {:.4}", test_score.loss, test_score.acc);
    write_test_score(ckpt_manager.dir(), &test_score)?;

    // ── Persist artifacts ─────────────────────────────────────────────────────
    ckpt_manager.save_model(&model_valid)?;
    ckpt_manager.save_model_config(model_cfg)?;
    ckpt_manager.save_class_index(&generators.class_index)?;

    tracing::info!("Training complete!");
    Ok(TrainingOutcome { history, test_score, running_time })
}

/// Sample-weighted loss and accuracy over one loader pass.
/// An empty loader yields NaN loss and zero accuracy.
pub fn evaluate<B: Backend>(
    model:  &ArtworkClassifier<B>,
    loader: &dyn DataLoader<ImageBatch<B>>,
) -> TestScore {
    let mut running = Running::default();
    for batch in loader.iter() {
        let samples = batch.labels.dims()[0];
        let (loss, logits) = model.forward_loss(batch.images, batch.labels.clone());
        running.add(
            loss.into_scalar().elem::<f64>(),
            count_correct(logits, batch.labels),
            samples,
        );
    }
    TestScore { loss: running.loss(), acc: running.accuracy() }
}

fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns shape [batch, 1] — flatten to [batch]
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted.equal(labels).int().sum().into_scalar().elem::<i64>();
    correct.max(0) as usize
}

#[derive(Debug, Default)]
struct Running {
    loss_sum: f64,
    correct:  usize,
    samples:  usize,
}

impl Running {
    fn add(&mut self, batch_loss: f64, correct: usize, samples: usize) {
        self.loss_sum += batch_loss * samples as f64;
        self.correct  += correct;
        self.samples  += samples;
    }

    fn loss(&self) -> f64 {
        if self.samples > 0 { self.loss_sum / self.samples as f64 } else { f64::NAN }
    }

    fn accuracy(&self) -> f64 {
        if self.samples > 0 { self.correct as f64 / self.samples as f64 } else { 0.0 }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generator::{create_generators, GeneratorConfig};
    use crate::domain::artwork::MetadataRecord;
    use crate::infra::metrics::{HISTORY_FILE, TEST_SCORE_FILE};
    use crate::ml::backbone::BackboneConfig;
    use burn::backend::{Autodiff, NdArray};
    use image::{Rgb, RgbImage};
    use rand::{rngs::StdRng, SeedableRng};

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_running_weights_by_samples() {
        let mut r = Running::default();
        r.add(1.0, 2, 2);
        r.add(4.0, 0, 1);
        assert!((r.loss() - 2.0).abs() < 1e-12);
        assert!((r.accuracy() - 2.0 / 3.0).abs() < 1e-12);
        assert!(Running::default().loss().is_nan());
    }

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        let logits = Tensor::<NdArray, 2>::from_floats([[0.9, 0.1], [0.2, 0.8], [0.7, 0.3]], &device);
        let labels = Tensor::<NdArray, 1, Int>::from_ints([0, 1, 1], &device);
        assert_eq!(count_correct(logits, labels), 2);
    }

    #[test]
    fn test_end_to_end_writes_all_artifacts() {
        let images = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let rows: Vec<MetadataRecord> = (0..10)
            .map(|i| {
                let file_name = format!("{i}.png");
                let colour = if i % 2 == 0 { Rgb([250, 10, 10]) } else { Rgb([10, 10, 250]) };
                RgbImage::from_pixel(10, 10, colour).save(images.path().join(&file_name)).unwrap();
                MetadataRecord {
                    id: i.to_string(),
                    genre: if i % 2 == 0 { "portrait" } else { "landscape" }.to_string(),
                    file_name,
                    ..Default::default()
                }
            })
            .collect();

        let gen_cfg = GeneratorConfig { image_size: (8, 8), batch_size: 3, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(1);
        let generators = create_generators(rows, images.path(), &gen_cfg, &mut rng).unwrap();

        let cfg = TrainConfig {
            output_dir: out.path().to_path_buf(),
            generator: gen_cfg,
            epochs: 2,
            seed: Some(7),
            ..Default::default()
        };
        let model_cfg = ArtworkClassifierConfig::new(generators.class_index.len())
            .with_backbone(BackboneConfig::new().with_stages(vec![vec![4]]))
            .with_hidden_sizes(vec![8]);
        let ckpt = CheckpointManager::new(out.path()).unwrap();

        let outcome = train_loop::<TestBackend>(
            &cfg, &model_cfg, &generators, 1, &ckpt, Default::default(),
        )
        .unwrap();

        assert_eq!(outcome.history.len(), 2);
        assert!(outcome.test_score.acc >= 0.0 && outcome.test_score.acc <= 1.0);

        let history = std::fs::read_to_string(out.path().join(HISTORY_FILE)).unwrap();
        assert!(history.starts_with("epochs=2, running time="));
        assert_eq!(history.lines().count(), 4);

        let score = std::fs::read_to_string(out.path().join(TEST_SCORE_FILE)).unwrap();
        assert!(score.starts_with("loss: "));

        assert_eq!(ckpt.load_class_index().unwrap(), generators.class_index);
        let restored = ckpt
            .load_model::<NdArray>(&Default::default())
            .unwrap();
        assert_eq!(restored.num_classes(), 2);
    }
}
