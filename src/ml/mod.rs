// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the network, the training loop and the
// inference engine. Everything that builds or runs a model
// lives here.
//
// Why isolate Burn model code here?
//   - If Burn's API changes, we mostly update this layer
//   - The model architecture is clearly separated from
//     data loading and application logic
//
// What's in this layer:
//
//   backbone.rs   — VGG16 convolutional feature extractor
//                   • 13 conv 3×3 + ReLU, 5 max-pools
//                   • Frozen (no gradients)
//                   • Optional PyTorch weight import
//
//   model.rs      — The classifier
//                   • Backbone → global average pooling
//                   • Dense 1024 → 1024 → 512 (ReLU)
//                   • Dense num_classes with softmax output
//
//   trainer.rs    — The training loop
//                   Forward pass, cross-entropy loss, backward
//                   pass, Adam step, per-epoch validation,
//                   final test evaluation and artifact saving
//
//   inferencer.rs — The inference engine
//                   Loads a finished run and ranks the
//                   labels for one image
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Simonyan & Zisserman (2015) VGG

/// Frozen VGG16 feature extractor
pub mod backbone;

/// Backbone + dense classification head
pub mod model;

/// Full training loop with validation and test evaluation
pub mod trainer;

/// Inference engine — loads a run and predicts labels
pub mod inferencer;
