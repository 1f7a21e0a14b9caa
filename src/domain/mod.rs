// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits that describe the artwork
// dataset: what a metadata record IS, how labels are named,
// and what a metadata source must be able to do.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One scraped artwork and the CSV column layout
pub mod artwork;

// Label collapsing and the class-index mapping
pub mod label;

// Core abstractions (traits) that other layers implement
pub mod traits;
