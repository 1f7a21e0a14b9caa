use std::path::Path;

use anyhow::Result;
use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    prelude::*,
    tensor::activation::softmax,
};

use crate::ml::backbone::{Backbone, BackboneConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct ArtworkClassifierConfig {
    pub num_classes:  usize,
    #[config(default = "BackboneConfig::new()")]
    pub backbone:     BackboneConfig,
    /// Widths of the trainable dense layers between pooling and output
    #[config(default = "vec![1024, 1024, 512]")]
    pub hidden_sizes: Vec<usize>,
}

impl ArtworkClassifierConfig {
    /// Randomly initialised network; the backbone starts frozen.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ArtworkClassifier<B> {
        let backbone = self.backbone.init(device);
        self.with_head(backbone, device)
    }

    /// Same architecture, backbone weights imported from a PyTorch file.
    pub fn init_pretrained<B: Backend>(
        &self,
        weights: &Path,
        device:  &B::Device,
    ) -> Result<ArtworkClassifier<B>> {
        let backbone = self.backbone.init_pretrained(weights, device)?;
        Ok(self.with_head(backbone, device))
    }

    fn with_head<B: Backend>(&self, backbone: Backbone<B>, device: &B::Device) -> ArtworkClassifier<B> {
        let mut width = self.backbone.out_channels();
        let hidden = self
            .hidden_sizes
            .iter()
            .map(|&out| {
                let layer = LinearConfig::new(width, out).init(device);
                width = out;
                layer
            })
            .collect();
        let output = LinearConfig::new(width, self.num_classes).init(device);

        ArtworkClassifier {
            backbone,
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            hidden,
            output,
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct ArtworkClassifier<B: Backend> {
    pub backbone:   Backbone<B>,
    pub pool:       AdaptiveAvgPool2d,
    pub hidden:     Vec<Linear<B>>,
    pub output:     Linear<B>,
    pub activation: Relu,
}

impl<B: Backend> ArtworkClassifier<B> {
    /// images: [batch, 3, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.backbone.forward(images);
        // Global average pooling: [batch, C, h, w] → [batch, C]
        let mut x = self.pool.forward(features).flatten::<2>(1, 3);
        for layer in &self.hidden {
            x = self.activation.forward(layer.forward(x));
        }
        self.output.forward(x)
    }

    /// Softmax class probabilities, each row sums to 1.
    pub fn predict_proba(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// Categorical cross-entropy over the logits.
    /// Returns (loss, logits) so callers can also count hits.
    pub fn forward_loss(
        &self,
        images: Tensor<B, 4>,
        labels: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        (loss, logits)
    }

    pub fn num_classes(&self) -> usize {
        self.output.weight.dims()[1]
    }
}
