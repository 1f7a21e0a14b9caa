// ============================================================
// Layer 4 — Image Augmentation Policy
// ============================================================
// Random geometric jitter applied to each training image every
// time it is batched, so no two epochs see the exact same
// pixels:
//
//   rotation_range     = 20   → rotate by U(-20°, 20°) about the centre
//   width_shift_range  = 0.2  → shift by U(-0.2, 0.2) × width
//   height_shift_range = 0.2  → shift by U(-0.2, 0.2) × height
//   rescale            = 1/255 → pixel values into [0, 1]
//
// Pixels that fall outside the source image take the value of
// the nearest edge pixel.
//
// Validation shares the training policy; the test split is only
// rescaled.

use image::{Rgb, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How an image is jittered and rescaled before it reaches the network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentationPolicy {
    /// Maximum absolute rotation in degrees
    pub rotation_range: f32,
    /// Maximum horizontal shift as a fraction of the width
    pub width_shift_range: f32,
    /// Maximum vertical shift as a fraction of the height
    pub height_shift_range: f32,
    /// Multiplier applied to every raw 0..=255 channel value
    pub rescale: f32,
}

/// One sampled affine jitter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Jitter {
    pub degrees: f32,
    pub shift_x: f32,
    pub shift_y: f32,
}

impl AugmentationPolicy {
    pub fn training() -> Self {
        Self {
            rotation_range:     20.0,
            width_shift_range:  0.2,
            height_shift_range: 0.2,
            rescale:            1.0 / 255.0,
        }
    }

    pub fn rescale_only() -> Self {
        Self {
            rotation_range:     0.0,
            width_shift_range:  0.0,
            height_shift_range: 0.0,
            rescale:            1.0 / 255.0,
        }
    }

    pub fn is_geometric(&self) -> bool {
        self.rotation_range > 0.0 || self.width_shift_range > 0.0 || self.height_shift_range > 0.0
    }

    /// Draw a random jitter for an image of `width × height`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, width: u32, height: u32) -> Jitter {
        let mut uniform = |range: f32| {
            if range > 0.0 { rng.gen_range(-range..=range) } else { 0.0 }
        };
        Jitter {
            degrees: uniform(self.rotation_range),
            shift_x: uniform(self.width_shift_range) * width as f32,
            shift_y: uniform(self.height_shift_range) * height as f32,
        }
    }

    /// Randomly jitter `img`; identity when the policy has no geometric part.
    pub fn augment<R: Rng + ?Sized>(&self, img: RgbImage, rng: &mut R) -> RgbImage {
        if !self.is_geometric() {
            return img;
        }
        let jitter = self.sample(rng, img.width(), img.height());
        apply_jitter(&img, jitter)
    }

    /// Rescale and lay out as planar CHW floats: [R..., G..., B...].
    pub fn to_chw(&self, img: &RgbImage) -> Vec<f32> {
        let plane = (img.width() * img.height()) as usize;
        let mut out = vec![0.0f32; plane * 3];
        for (i, px) in img.pixels().enumerate() {
            for c in 0..3 {
                out[c * plane + i] = px[c] as f32 * self.rescale;
            }
        }
        out
    }
}

/// Resample `src` under a rotation about the centre followed by a shift.
/// Each output pixel looks up its source position through the inverse
/// transform and takes the nearest pixel, clamped to the image border.
pub fn apply_jitter(src: &RgbImage, jitter: Jitter) -> RgbImage {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let cx = (w as f32 - 1.0) / 2.0;
    let cy = (h as f32 - 1.0) / 2.0;
    let (sin, cos) = jitter.degrees.to_radians().sin_cos();

    let mut out = RgbImage::new(w, h);
    for (x, y, px) in out.enumerate_pixels_mut() {
        // undo the shift, then the rotation
        let dx = x as f32 - jitter.shift_x - cx;
        let dy = y as f32 - jitter.shift_y - cy;
        let sx = cos * dx + sin * dy + cx;
        let sy = -sin * dx + cos * dy + cy;

        let sx = sx.round().clamp(0.0, (w - 1) as f32) as u32;
        let sy = sy.round().clamp(0.0, (h - 1) as f32) as u32;
        *px = *src.get_pixel(sx, sy);
    }
    out
}
