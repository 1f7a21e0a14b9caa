// ============================================================
// Layer 5 — VGG16 Convolutional Backbone
// ============================================================
// The pretrained feature extractor the classifier head sits on.
//
//   stage 1:  conv3-64  → conv3-64                → maxpool /2
//   stage 2:  conv3-128 → conv3-128               → maxpool /2
//   stage 3:  conv3-256 → conv3-256 → conv3-256   → maxpool /2
//   stage 4:  conv3-512 → conv3-512 → conv3-512   → maxpool /2
//   stage 5:  conv3-512 → conv3-512 → conv3-512   → maxpool /2
//
// Every conv is 3×3, stride 1, padding 1, followed by ReLU, so
// only the pools change the spatial size: 256×256 → 8×8.
//
// The backbone is FROZEN: its parameters never receive
// gradients, so Adam only updates the classifier head.
//
// Weights can be imported from a torchvision `vgg16` state dict.
// There the convs live at `features.{i}` where i counts every
// conv, ReLU and pool layer in order; the key remaps below
// translate those indices into `stages.{s}.convs.{c}`.
//
// Reference: Simonyan & Zisserman (2015) Very Deep Convolutional
//            Networks for Large-Scale Image Recognition
//            Burn Book §6 (Importing PyTorch Models)

use std::path::Path;

use anyhow::{bail, Context, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
    record::{FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

#[derive(Config, Debug)]
pub struct BackboneConfig {
    /// Output channels of each conv, grouped by pooling stage
    #[config(default = "vec![vec![64, 64], vec![128, 128], vec![256, 256, 256], vec![512, 512, 512], vec![512, 512, 512]]")]
    pub stages: Vec<Vec<usize>>,
    #[config(default = 3)]
    pub in_channels: usize,
}

impl BackboneConfig {
    /// Channels of the final feature map.
    pub fn out_channels(&self) -> usize {
        self.stages
            .iter()
            .rev()
            .find_map(|s| s.last().copied())
            .unwrap_or(self.in_channels)
    }

    /// Build a frozen backbone with random weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Backbone<B> {
        let mut channels = self.in_channels;
        let stages = self
            .stages
            .iter()
            .map(|widths| {
                let convs = widths
                    .iter()
                    .map(|&out| {
                        let conv = Conv2dConfig::new([channels, out], [3, 3])
                            .with_padding(PaddingConfig2d::Explicit(1, 1))
                            .init(device);
                        channels = out;
                        conv
                    })
                    .collect();
                let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
                VggStage { convs, pool }
            })
            .collect();

        Backbone { stages, activation: Relu::new() }.no_grad()
    }

    /// `(pattern, replacement)` pairs mapping torchvision
    /// `features.{i}` keys onto this module's record layout.
    pub fn pytorch_key_remaps(&self) -> Vec<(String, String)> {
        let mut remaps = Vec::new();
        let mut index = 0usize;
        for (s, widths) in self.stages.iter().enumerate() {
            for c in 0..widths.len() {
                remaps.push((
                    format!(r"^features\.{index}\.(weight|bias)$"),
                    format!("stages.{s}.convs.{c}.$1"),
                ));
                // conv + relu
                index += 2;
            }
            // pool
            index += 1;
        }
        remaps
    }

    /// Build the backbone and fill it from a PyTorch state-dict file.
    pub fn init_pretrained<B: Backend>(&self, path: &Path, device: &B::Device) -> Result<Backbone<B>> {
        if !path.is_file() {
            bail!("Backbone weights '{}' not found", path.display());
        }

        let mut args = LoadArgs::new(path.to_path_buf());
        for (pattern, replacement) in self.pytorch_key_remaps() {
            args = args.with_key_remap(&pattern, &replacement);
        }

        let record: BackboneRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
            .load(args, device)
            .with_context(|| format!("Cannot import backbone weights from '{}'", path.display()))?;

        tracing::info!("Loaded pretrained backbone from '{}'", path.display());
        // load_record brings back trainable params; freeze again
        Ok(self.init::<B>(device).load_record(record).no_grad())
    }
}

#[derive(Module, Debug)]
pub struct VggStage<B: Backend> {
    pub convs: Vec<Conv2d<B>>,
    pub pool:  MaxPool2d,
}

#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    pub stages:     Vec<VggStage<B>>,
    pub activation: Relu,
}

impl<B: Backend> Backbone<B> {
    /// images: [batch, 3, H, W] → features: [batch, C, H/32, W/32]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.stages.iter().fold(images, |x, stage| {
            let x = stage
                .convs
                .iter()
                .fold(x, |x, conv| self.activation.forward(conv.forward(x)));
            stage.pool.forward(x)
        })
    }
}
