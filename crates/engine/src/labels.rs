//! Category label codec: dense indices for the classifier, strings for
//! everyone else.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bidirectional mapping between category labels and dense class indices.
///
/// Labels are sorted, so the index assignment is deterministic for a given
/// category set. Indices are only meaningful relative to the classifier
/// trained against the same codec, which is why the two always travel
/// together inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCodec {
    labels: Vec<String>,
}

impl LabelCodec {
    /// Derive a codec over the distinct labels of an iterator.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        LabelCodec {
            labels: unique.into_iter().collect(),
        }
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        let needle = label.trim().to_lowercase();
        self.labels.binary_search(&needle).ok()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.encode(label).is_some()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_sorts_and_dedupes() {
        let codec = LabelCodec::fit(["transport", "courses", "transport", "banque"]);
        assert_eq!(codec.labels(), ["banque", "courses", "transport"]);
        assert_eq!(codec.len(), 3);
    }

    #[test]
    fn encode_decode_round_trip() {
        let codec = LabelCodec::fit(["courses", "banque"]);
        for label in ["banque", "courses"] {
            let idx = codec.encode(label).unwrap();
            assert_eq!(codec.decode(idx), Some(label));
        }
    }

    #[test]
    fn encode_normalizes_case_and_whitespace() {
        let codec = LabelCodec::fit(["Courses "]);
        assert_eq!(codec.encode("COURSES"), Some(0));
    }

    #[test]
    fn unknown_label_and_index_are_none() {
        let codec = LabelCodec::fit(["banque"]);
        assert_eq!(codec.encode("voyage"), None);
        assert_eq!(codec.decode(7), None);
    }

    #[test]
    fn empty_labels_are_dropped() {
        let codec = LabelCodec::fit(["", "  ", "banque"]);
        assert_eq!(codec.labels(), ["banque"]);
    }
}
