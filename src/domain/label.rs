// ============================================================
// Layer 3 — Labels and the Class-Index Mapping
// ============================================================
// Artwork tags are hierarchical and comma separated, e.g.
// "abstract, cubism". Only the highest tag is trained on.
//
// The class-index mapping is fixed once from the full filtered
// dataset, BEFORE splitting, so every split and the final
// softmax layer agree on which integer means which label.
// Indices follow sorted label order.

use std::collections::{BTreeMap, BTreeSet};

/// Keep only the highest tag in the hierarchy:
/// "abstract, cubism" → "abstract"
pub fn collapse_label(raw: &str) -> String {
    raw.split(',').next().unwrap_or("").trim().to_string()
}

/// Bidirectional label ↔ index association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIndex {
    labels:  Vec<String>,
    indices: BTreeMap<String, usize>,
}

impl ClassIndex {
    /// Build from any collection of labels; duplicates collapse.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        let labels: Vec<String> = sorted.into_iter().collect();
        let indices = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        Self { labels, indices }
    }

    /// Rebuild from a persisted label → index map. Returns `None`
    /// unless the indices are exactly 0..n.
    pub fn from_map(indices: BTreeMap<String, usize>) -> Option<Self> {
        let mut labels = vec![None; indices.len()];
        for (label, &i) in &indices {
            let slot = labels.get_mut(i)?;
            if slot.replace(label.clone()).is_some() {
                return None;
            }
        }
        let labels = labels.into_iter().collect::<Option<Vec<String>>>()?;
        Some(Self { labels, indices })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.indices.get(label).copied()
    }

    pub fn label_of(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The label → index map as persisted next to the model.
    pub fn as_map(&self) -> &BTreeMap<String, usize> {
        &self.indices
    }
}
