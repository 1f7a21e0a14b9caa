// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from the pickled URL list
// all the way to GPU-ready tensor batches.
//
// The pipeline flows in this order:
//
//   artworks_urls.pkl
//       │
//       ▼
//   url_list          → reads the pickled list of painting URLs
//       │
//       ▼  (build-csv, via infra::wikiart)
//   table             → writes / reads the metadata CSV,
//       │               drops missing labels, collapses tags
//       ▼
//   splitter          → train / validation / test rows
//       │
//       ▼
//   generator         → one ImageGenerator per split
//       │
//       ▼
//   ArtworkDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → decodes, augments and stacks images
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Each module is responsible for exactly one step.
// This makes each step independently testable and replaceable.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads the pickled list of artwork URLs
pub mod url_list;

/// CSV persistence and label preparation
pub mod table;

/// Shuffles and splits rows into train/validation/test sets
pub mod splitter;

/// Random rotation/shift augmentation and rescaling
pub mod augment;

/// Implements Burn's Dataset trait for image paths
pub mod dataset;

/// Implements Burn's Batcher trait to create image tensor batches
pub mod batcher;

/// Wires the splits into restartable batch generators
pub mod generator;
