// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   http.rs       — Shared HTTP agent
//                   Timeouts, bounded body reads and
//                   exponential-backoff retry for GET requests.
//
//   wikiart.rs    — WikiArt client
//                   Implements the domain's MetadataSource and
//                   ImageSource traits on top of http.rs.
//
//   workers.rs    — Worker count from the NSLOTS variable
//                   set by the batch scheduler.
//
//   checkpoint.rs — Saving and loading run artifacts
//                   Uses Burn's CompactRecorder for weights,
//                   JSON for configs and a pickle for the
//                   class-index mapping.
//
//   metrics.rs    — Training history and test score files
//
// Why is this a separate layer?
//   These concerns are used by multiple other layers but
//   don't belong to any one of them. Keeping them here:
//   - Prevents duplication across layers
//   - Makes it easy to swap implementations
//     (e.g. another metadata host behind the same trait)
//   - Keeps other layers focused on their core logic
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Retrying HTTP GET helpers
pub mod http;

/// WikiArt metadata and image client
pub mod wikiart;

/// NSLOTS worker-count parsing
pub mod workers;

/// Model, config and class-index persistence
pub mod checkpoint;

/// Training history and test score writers
pub mod metrics;
