use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One image on disk and its class index. Pixels are only read
/// when the item is batched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageItem {
    pub path:  PathBuf,
    pub label: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ArtworkDataset {
    items: Vec<ImageItem>,
}

impl ArtworkDataset {
    pub fn new(items: Vec<ImageItem>) -> Self { Self { items } }

    pub fn items(&self) -> &[ImageItem] { &self.items }

    /// Number of distinct class indices present in this split.
    pub fn class_count(&self) -> usize {
        let mut labels: Vec<usize> = self.items.iter().map(|i| i.label).collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }
}

impl Dataset<ImageItem> for ArtworkDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
