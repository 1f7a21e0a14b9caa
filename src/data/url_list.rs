// ============================================================
// Layer 4 — URL List Loader
// ============================================================
// The list of artwork pages to scrape is a Python pickle of a
// plain list of strings. serde-pickle decodes it straight into
// a Vec<String>; anything else in the file is an error.

use anyhow::{Context, Result};
use std::{fs::File, io::BufReader, path::Path};

/// Load the pickled URL list, keeping at most `limit` entries.
pub fn load_url_list(path: &Path, limit: Option<usize>) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open URL list '{}'", path.display()))?;
    let mut urls: Vec<String> =
        serde_pickle::from_reader(BufReader::new(file), serde_pickle::DeOptions::new())
            .with_context(|| format!("'{}' is not a pickled list of strings", path.display()))?;

    if let Some(n) = limit {
        urls.truncate(n);
    }
    tracing::info!("Loaded {} URLs from '{}'", urls.len(), path.display());
    Ok(urls)
}
