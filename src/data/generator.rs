// ============================================================
// Layer 4 — Data Generators
// ============================================================
// Turns the filtered CSV rows into three lazy batch streams:
//
//   rows ──prepare_labels──► filtered rows ──► ClassIndex (all rows)
//                │
//          split_train_test (20% test)
//                │
//        validation_subset (20% of train)
//                │
//   ImageGenerator × 3  (train / validation / test)
//
// Each ImageGenerator owns its items and its augmentation
// policy, and hands out a fresh Burn DataLoader on demand.
// A DataLoader is finite per epoch and can be iterated again,
// so one loader serves every epoch.
//
// The loader itself runs one partition over the whole split, so
// every batch but the last is full and len() is the real step
// count. Worker threads parallelise image decoding inside each
// batch instead.

use std::{path::Path, sync::Arc};

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::{
    augment::AugmentationPolicy,
    batcher::{ImageBatch, ImageBatcher},
    dataset::{ArtworkDataset, ImageItem},
    splitter::{split_train_test, validation_subset},
    table::prepare_labels,
};
use crate::domain::{artwork::MetadataRecord, label::ClassIndex};

/// Everything the generators need to know about the data layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Target size as (width, height)
    pub image_size:       (u32, u32),
    pub batch_size:       usize,
    /// Column holding the label to predict
    pub label_column:     String,
    /// Column holding the image file name
    pub image_column:     String,
    pub test_fraction:    f64,
    pub validation_split: f64,
    pub train_policy:     AugmentationPolicy,
    pub test_policy:      AugmentationPolicy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            image_size:       (256, 256),
            batch_size:       32,
            label_column:     "genre".to_string(),
            image_column:     "file_name".to_string(),
            test_fraction:    0.2,
            validation_split: 0.2,
            train_policy:     AugmentationPolicy::training(),
            test_policy:      AugmentationPolicy::rescale_only(),
        }
    }
}

/// A restartable source of (image batch, label batch) pairs for one split.
#[derive(Debug, Clone)]
pub struct ImageGenerator {
    dataset:    ArtworkDataset,
    policy:     AugmentationPolicy,
    image_size: (u32, u32),
    batch_size: usize,
}

impl ImageGenerator {
    pub fn new(
        dataset:    ArtworkDataset,
        policy:     AugmentationPolicy,
        image_size: (u32, u32),
        batch_size: usize,
    ) -> Self {
        Self { dataset, policy, image_size, batch_size: batch_size.max(1) }
    }

    /// Number of batches per epoch.
    pub fn len(&self) -> usize {
        self.num_items().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.num_items() == 0
    }

    pub fn num_items(&self) -> usize {
        self.dataset.items().len()
    }

    pub fn dataset(&self) -> &ArtworkDataset {
        &self.dataset
    }

    /// Build a DataLoader on `device` whose batches are decoded by
    /// `workers` threads. `shuffle_seed` reshuffles every epoch.
    pub fn loader<B: Backend>(
        &self,
        device:       B::Device,
        workers:      usize,
        shuffle_seed: Option<u64>,
    ) -> Arc<dyn DataLoader<ImageBatch<B>>> {
        let batcher = ImageBatcher::<B>::new(device, self.image_size, self.policy)
            .with_decode_workers(workers);
        let builder = DataLoaderBuilder::new(batcher).batch_size(self.batch_size);
        let builder = match shuffle_seed {
            Some(seed) => builder.shuffle(seed),
            None       => builder,
        };
        builder.build(self.dataset.clone())
    }
}

/// The three generators plus the class mapping they share.
#[derive(Debug, Clone)]
pub struct Generators {
    pub class_index: ClassIndex,
    pub train:       ImageGenerator,
    pub validation:  ImageGenerator,
    pub test:        ImageGenerator,
}

/// Filter, split and wrap the dataset rows.
pub fn create_generators<R: Rng + ?Sized>(
    records:    Vec<MetadataRecord>,
    images_dir: &Path,
    cfg:        &GeneratorConfig,
    rng:        &mut R,
) -> Result<Generators> {
    let rows = prepare_labels(records, &cfg.label_column)?;
    if rows.is_empty() {
        bail!("No rows with a '{}' label left to train on", cfg.label_column);
    }

    // Fixed from the full filtered dataset so every split agrees
    let class_index = ClassIndex::from_labels(
        rows.iter().filter_map(|r| r.column(&cfg.label_column)).map(str::to_string),
    );

    let (train_rows, test_rows) = split_train_test(rows, cfg.test_fraction, rng);
    let (train_rows, val_rows)  = validation_subset(train_rows, cfg.validation_split);

    let build = |name: &str, rows: &[MetadataRecord], policy: AugmentationPolicy| {
        let dataset = to_dataset(name, rows, images_dir, cfg, &class_index)?;
        tracing::info!(
            "{name} set: found {} images belonging to {} classes",
            dataset.items().len(),
            class_index.len()
        );
        if dataset.class_count() < class_index.len() {
            tracing::debug!(
                "{name} set covers only {} of {} classes",
                dataset.class_count(),
                class_index.len()
            );
        }
        Ok::<_, anyhow::Error>(ImageGenerator::new(dataset, policy, cfg.image_size, cfg.batch_size))
    };

    let train      = build("Training", &train_rows, cfg.train_policy)?;
    let validation = build("Validation", &val_rows, cfg.train_policy)?;
    let test       = build("Test", &test_rows, cfg.test_policy)?;

    Ok(Generators { class_index, train, validation, test })
}

fn to_dataset(
    split:       &str,
    rows:        &[MetadataRecord],
    images_dir:  &Path,
    cfg:         &GeneratorConfig,
    class_index: &ClassIndex,
) -> Result<ArtworkDataset> {
    let mut items = Vec::with_capacity(rows.len());
    let mut missing = 0usize;

    for row in rows {
        let Some(file_name) = row.column(&cfg.image_column) else {
            bail!("Unknown image column '{}'", cfg.image_column);
        };
        let path = images_dir.join(file_name);
        if file_name.is_empty() || !path.is_file() {
            missing += 1;
            continue;
        }
        let label = row
            .column(&cfg.label_column)
            .and_then(|l| class_index.index_of(l));
        if let Some(label) = label {
            items.push(ImageItem { path, label });
        }
    }

    if missing > 0 {
        tracing::warn!("{split} set: skipping {missing} rows whose image file is missing");
    }
    Ok(ArtworkDataset::new(items))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::BTreeSet;

    pub(crate) fn fixture(dir: &Path, genres: &[&str]) -> Vec<MetadataRecord> {
        genres
            .iter()
            .enumerate()
            .map(|(i, g)| {
                let file_name = format!("img{i}.jpg!Large.jpg");
                let shade = (i * 20 % 255) as u8;
                RgbImage::from_pixel(12, 12, Rgb([shade, 0, 255 - shade]))
                    .save_with_format(dir.join(&file_name), image::ImageFormat::Png)
                    .unwrap();
                MetadataRecord {
                    id: format!("id{i}"),
                    genre: g.to_string(),
                    file_name,
                    ..Default::default()
                }
            })
            .collect()
    }

    fn small_config() -> GeneratorConfig {
        GeneratorConfig { image_size: (8, 8), batch_size: 3, ..Default::default() }
    }

    #[test]
    fn test_class_index_is_distinct_collapsed_labels() {
        let dir = tempfile::tempdir().unwrap();
        let genres = [
            "portrait", "landscape, urban", "?", "portrait", "abstract, cubism",
            "landscape", "", "religious painting", "portrait", "landscape",
        ];
        let rows = fixture(dir.path(), &genres);
        let mut rng = StdRng::seed_from_u64(5);
        let gens = create_generators(rows, dir.path(), &small_config(), &mut rng).unwrap();

        let expected: BTreeSet<&str> =
            ["abstract", "landscape", "portrait", "religious painting"].into_iter().collect();
        let got: BTreeSet<&str> = gens.class_index.labels().iter().map(String::as_str).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_splits_partition_filtered_rows() {
        let dir = tempfile::tempdir().unwrap();
        let genres: Vec<&str> = (0..20).map(|i| if i % 2 == 0 { "a" } else { "b" }).collect();
        let rows = fixture(dir.path(), &genres);
        let mut rng = StdRng::seed_from_u64(9);
        let gens = create_generators(rows, dir.path(), &small_config(), &mut rng).unwrap();

        assert_eq!(gens.test.num_items(), 4);
        assert_eq!(gens.validation.num_items(), 3);
        assert_eq!(gens.train.num_items(), 13);
        assert_eq!(gens.train.len(), 5);

        let mut seen = BTreeSet::new();
        for g in [&gens.train, &gens.validation, &gens.test] {
            for item in g.dataset().items() {
                assert!(seen.insert(item.path.clone()));
            }
        }
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn test_missing_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows = fixture(dir.path(), &["a", "b", "a", "b", "a"]);
        rows[0].file_name = "gone.jpg".to_string();
        let cfg = GeneratorConfig { test_fraction: 0.0, validation_split: 0.0, ..small_config() };
        let mut rng = StdRng::seed_from_u64(2);
        let gens = create_generators(rows, dir.path(), &cfg, &mut rng).unwrap();
        assert_eq!(gens.train.num_items(), 4);
        assert_eq!(gens.class_index.len(), 2);
    }

    #[test]
    fn test_no_labels_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let rows = fixture(dir.path(), &["?", ""]);
        let mut rng = StdRng::seed_from_u64(2);
        assert!(create_generators(rows, dir.path(), &small_config(), &mut rng).is_err());
    }

    #[test]
    fn test_loader_yields_every_item_once_per_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let rows = fixture(dir.path(), &["a", "b", "a", "b", "a", "b", "a"]);
        let cfg = GeneratorConfig { test_fraction: 0.0, validation_split: 0.0, ..small_config() };
        let mut rng = StdRng::seed_from_u64(3);
        let gens = create_generators(rows, dir.path(), &cfg, &mut rng).unwrap();

        let loader = gens.train.loader::<NdArray>(Default::default(), 1, Some(42));
        for _epoch in 0..2 {
            let sizes: Vec<usize> = loader.iter().map(|b| b.images.dims()[0]).collect();
            assert_eq!(sizes.len(), gens.train.len());
            assert_eq!(sizes.iter().sum::<usize>(), 7);
        }
    }

    #[test]
    fn test_several_workers_still_give_full_batches() {
        let dir = tempfile::tempdir().unwrap();
        let rows = fixture(dir.path(), &["a", "b", "a", "b", "a", "b", "a", "b", "a"]);
        let cfg = GeneratorConfig { test_fraction: 0.0, validation_split: 0.0, ..small_config() };
        let mut rng = StdRng::seed_from_u64(4);
        let gens = create_generators(rows, dir.path(), &cfg, &mut rng).unwrap();
        assert_eq!(gens.train.len(), 3);

        let loader = gens.train.loader::<NdArray>(Default::default(), 4, Some(7));
        let sizes: Vec<usize> = loader.iter().map(|b| b.images.dims()[0]).collect();
        assert_eq!(sizes, vec![3, 3, 3]);
    }
}
