//! Versioned bundle of model artifacts published as one unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::embed::{Embedder, EmbeddingConfig};
use crate::forest::{ForestClassifier, TrainingConfig};
use crate::labels::LabelCodec;

/// The live classifier: embedding backend, fitted ensemble, and label codec.
///
/// The three are only meaningful together — the codec's indices refer to the
/// classes this particular ensemble was trained on — so they are replaced as
/// one unit and never mutated in place. Readers share the snapshot through
/// an `Arc` and keep using their copy even while a newer one is published.
pub struct ClassifierSnapshot {
    /// Content digest over the corpus and training configuration.
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub codec: LabelCodec,
    pub heldout_accuracy: Option<f64>,
    pub(crate) forest: ForestClassifier,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) training: TrainingConfig,
    pub(crate) embedding: EmbeddingConfig,
}

impl ClassifierSnapshot {
    /// Run the model on an already-normalized merchant name.
    ///
    /// Returns `None` for an empty name (the embedding step must never see
    /// one) or when the codec cannot decode the predicted index.
    pub fn predict(&self, cleaned_name: &str) -> Option<(String, f64)> {
        if cleaned_name.is_empty() || self.codec.is_empty() {
            return None;
        }
        let features = self.embedder.embed(cleaned_name);
        let (index, proba) = self.forest.predict_one(&features);
        self.codec
            .decode(index)
            .map(|label| (label.to_string(), proba))
    }

    /// Provenance record persisted alongside the corpus. The model itself is
    /// reproducible from (corpus, training config, embedding config), so
    /// this is all the durable layer needs.
    pub fn meta(&self, corpus_size: usize) -> SnapshotMeta {
        SnapshotMeta {
            version: self.version.clone(),
            created_at: self.created_at,
            labels: self.codec.labels().to_vec(),
            corpus_size,
            heldout_accuracy: self.heldout_accuracy,
            training: self.training.clone(),
            embedding: self.embedding.clone(),
        }
    }
}

/// Serialized snapshot record, durable counterpart of [`ClassifierSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub labels: Vec<String>,
    pub corpus_size: usize,
    pub heldout_accuracy: Option<f64>,
    pub training: TrainingConfig,
    pub embedding: EmbeddingConfig,
}
