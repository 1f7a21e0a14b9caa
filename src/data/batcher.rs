// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait: turns a Vec<ImageItem>
// (paths + class indices) into GPU-ready tensors.
//
// This is where images are actually read. For every item:
//   1. decode the file (format sniffed from the bytes, since
//      file names may carry a "!Large.jpg" style suffix)
//   2. resize to the target size (nearest neighbour)
//   3. apply the split's augmentation policy
//   4. rescale and lay out as CHW floats
//
// With a decode pool the items of one batch are decoded in
// parallel on it; results keep the item order.
//
// Output shapes:
//   images: [batch_size, 3, height, width]
//   labels: [batch_size]
//
// Reference: Burn Book §4 (Batcher)

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};
use image::{imageops::FilterType, ImageReader, RgbImage};
use rayon::prelude::*;

use crate::data::augment::AugmentationPolicy;
use crate::data::dataset::ImageItem;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
/// A batch of images ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Pixel values — shape: [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,

    /// Ground truth class indices — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
    /// Target size as (width, height)
    pub image_size: (u32, u32),
    pub policy: AugmentationPolicy,
    /// Decodes a batch in parallel when set
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, image_size: (u32, u32), policy: AugmentationPolicy) -> Self {
        Self { device, image_size, policy, pool: None }
    }

    /// Decode with `workers` threads. One worker, or a pool that cannot
    /// be started, keeps decoding on the loader thread.
    pub fn with_decode_workers(mut self, workers: usize) -> Self {
        if workers <= 1 {
            self.pool = None;
            return self;
        }
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => self.pool = Some(Arc::new(pool)),
            Err(e) => {
                tracing::warn!("Cannot start {workers} decode workers ({e}); decoding sequentially");
                self.pool = None;
            }
        }
        self
    }

    pub fn decode_workers(&self) -> usize {
        self.pool.as_ref().map_or(1, |p| p.current_num_threads())
    }
}

/// Decode an image whatever its extension, resized to exactly `width × height`.
pub fn load_image(path: &Path, (width, height): (u32, u32)) -> Result<RgbImage> {
    let img = ImageReader::open(path)
        .with_context(|| format!("Cannot open image '{}'", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("Cannot sniff format of '{}'", path.display()))?
        .decode()
        .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
    Ok(img.resize_exact(width, height, FilterType::Nearest).to_rgb8())
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>) -> ImageBatch<B> {
        let (width, height) = self.image_size;
        let batch_size = items.len();
        let (size, policy) = (self.image_size, self.policy);

        let decoded: Vec<Vec<f32>> = match &self.pool {
            Some(pool) => pool.install(|| {
                items.par_iter().map(|item| decode_item(item, size, &policy)).collect()
            }),
            None => items.iter().map(|item| decode_item(item, size, &policy)).collect(),
        };
        let pixels: Vec<f32> = decoded.concat();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 3, height as usize, width as usize]),
            &self.device,
        );

        let labels: Vec<i32> = items.iter().map(|i| i.label as i32).collect();
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, labels }
    }
}

fn decode_item(item: &ImageItem, (width, height): (u32, u32), policy: &AugmentationPolicy) -> Vec<f32> {
    let img = match load_image(&item.path, (width, height)) {
        Ok(img) => img,
        // Unreadable files become blank images
        Err(e) => {
            tracing::warn!("{e:#}; using a blank image instead");
            RgbImage::new(width, height)
        }
    };
    let img = policy.augment(img, &mut rand::thread_rng());
    policy.to_chw(&img)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::Rgb;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes_and_labels() {
        let dir = tempfile::tempdir().unwrap();
        // no extension: the format must be sniffed from the content
        let red = dir.path().join("red");
        RgbImage::from_pixel(10, 7, Rgb([255, 0, 0]))
            .save_with_format(&red, image::ImageFormat::Png)
            .unwrap();

        let items = vec![
            ImageItem { path: red.clone(), label: 2 },
            ImageItem { path: dir.path().join("missing.jpg"), label: 0 },
        ];
        let batcher = ImageBatcher::<TestBackend>::new(
            Default::default(),
            (4, 3),
            AugmentationPolicy::rescale_only(),
        );
        let batch = batcher.batch(items);

        assert_eq!(batch.images.dims(), [2, 3, 3, 4]);
        let labels: Vec<i64> = batch.labels.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(labels, vec![2, 0]);

        let px: Vec<f32> = batch.images.into_data().convert::<f32>().to_vec().unwrap();
        // red channel of the first image is 1.0, blank second image is 0.0
        assert!((px[0] - 1.0).abs() < 1e-6);
        assert_eq!(px[12], 0.0);
        assert_eq!(px[36], 0.0);
    }

    #[test]
    fn test_pooled_decode_keeps_item_order() {
        let dir = tempfile::tempdir().unwrap();
        let items: Vec<ImageItem> = (0..6u8)
            .map(|i| {
                let path = dir.path().join(format!("{i}.png"));
                RgbImage::from_pixel(5, 5, Rgb([i * 40, 0, 0])).save(&path).unwrap();
                ImageItem { path, label: i as usize }
            })
            .collect();

        let sequential = ImageBatcher::<TestBackend>::new(
            Default::default(), (4, 4), AugmentationPolicy::rescale_only(),
        );
        let pooled = sequential.clone().with_decode_workers(3);
        assert_eq!((sequential.decode_workers(), pooled.decode_workers()), (1, 3));

        let a: Vec<f32> = sequential.batch(items.clone()).images.into_data().convert::<f32>().to_vec().unwrap();
        let b: Vec<f32> = pooled.batch(items).images.into_data().convert::<f32>().to_vec().unwrap();
        assert_eq!(a, b);
        // red channel of image i sits at offset i * 3 * 16
        assert!((b[5 * 48] - 200.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_image_resizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        RgbImage::new(20, 10).save(&path).unwrap();
        let img = load_image(&path, (8, 8)).unwrap();
        assert_eq!(img.dimensions(), (8, 8));
    }
}
