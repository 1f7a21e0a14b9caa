// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The dataset builder only needs "something that turns a URL
// into a MetadataRecord". Programming against this trait lets
// the builder run against the live HTTP fetcher in production
// and against an in-memory stub in tests.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use crate::domain::artwork::MetadataRecord;
use crate::infra::http::FetchError;

// ─── MetadataSource ───────────────────────────────────────────────────────────
/// Any component that can fetch artwork metadata for a page URL.
///
/// Implementations must be shareable across the worker pool.
///
/// Implementations:
///   - WikiArtFetcher → JSON endpoint of the artwork page
pub trait MetadataSource: Send + Sync {
    /// Fetch the metadata for one artwork page.
    fn fetch(&self, url: &str) -> Result<MetadataRecord, FetchError>;
}

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Any component that can download raw image bytes.
pub trait ImageSource: Send + Sync {
    fn download(&self, image_url: &str) -> Result<Vec<u8>, FetchError>;
}
