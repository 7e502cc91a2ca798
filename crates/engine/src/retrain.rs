//! Full-retrain step of the correction pipeline: corpus → fresh snapshot.

use chrono::Utc;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

use masruf_core::{BrandMap, EngineError};

use crate::embed::{Embedder, EmbeddingConfig};
use crate::forest::{ForestClassifier, TrainingConfig};
use crate::labels::LabelCodec;
use crate::snapshot::ClassifierSnapshot;

/// Phases of one correction-triggered retrain, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrainPhase {
    Merging,
    Retraining,
    Publishing,
}

impl fmt::Display for RetrainPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrainPhase::Merging => write!(f, "merging"),
            RetrainPhase::Retraining => write!(f, "retraining"),
            RetrainPhase::Publishing => write!(f, "publishing"),
        }
    }
}

/// Train a fresh snapshot from the full corpus.
///
/// Re-derives the label codec (the label space may have changed), drops
/// empty merchant names, splits off a seeded held-out partition, embeds the
/// training names and fits a new ensemble. The held-out accuracy is logged
/// but nothing gates publishing on it — a regressed model still ships.
pub fn train_snapshot(
    brand_map: &BrandMap,
    embedder: Arc<dyn Embedder>,
    training: &TrainingConfig,
    embedding: &EmbeddingConfig,
) -> Result<ClassifierSnapshot, EngineError> {
    let codec = LabelCodec::fit(brand_map.values());
    if codec.is_empty() {
        return Err(EngineError::RetrainFailure(
            "corpus has no category labels".to_string(),
        ));
    }

    let mut rows: Vec<(&str, usize)> = brand_map
        .iter()
        .filter(|(name, _)| !name.is_empty())
        .filter_map(|(name, label)| codec.encode(label).map(|index| (name.as_str(), index)))
        .collect();
    if rows.is_empty() {
        return Err(EngineError::RetrainFailure(
            "corpus has no non-empty merchant names".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(training.seed);
    rows.shuffle(&mut rng);
    let holdout = ((rows.len() as f64) * training.holdout_ratio).floor() as usize;
    let holdout = holdout.min(rows.len() - 1);
    let (train_rows, held_rows) = rows.split_at(rows.len() - holdout);

    let train_texts: Vec<&str> = train_rows.iter().map(|(name, _)| *name).collect();
    let features = embedder.embed_batch(&train_texts);
    let targets = Array1::from_iter(train_rows.iter().map(|(_, index)| *index));

    let forest = ForestClassifier::fit(&features, &targets, codec.len(), training)
        .map_err(|e| EngineError::RetrainFailure(e.to_string()))?;

    let heldout_accuracy = if held_rows.is_empty() {
        None
    } else {
        let held_texts: Vec<&str> = held_rows.iter().map(|(name, _)| *name).collect();
        let held_features = embedder.embed_batch(&held_texts);
        let held_targets = Array1::from_iter(held_rows.iter().map(|(_, index)| *index));
        Some(forest.accuracy(&held_features, &held_targets))
    };
    if let Some(accuracy) = heldout_accuracy {
        tracing::info!(
            accuracy,
            held_out = held_rows.len(),
            trained_on = train_rows.len(),
            "held-out evaluation (not a publish gate)"
        );
    }

    Ok(ClassifierSnapshot {
        version: snapshot_version(brand_map, training, embedding),
        created_at: Utc::now(),
        codec,
        heldout_accuracy,
        forest,
        embedder,
        training: training.clone(),
        embedding: embedding.clone(),
    })
}

/// Content digest identifying a snapshot: same corpus + same configuration
/// always produces the same version, since training is seeded.
pub fn snapshot_version(
    brand_map: &BrandMap,
    training: &TrainingConfig,
    embedding: &EmbeddingConfig,
) -> String {
    let mut hasher = Sha256::new();
    for (name, label) in brand_map {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(label.as_bytes());
        hasher.update([1u8]);
    }
    hasher.update(training.n_trees.to_le_bytes());
    hasher.update(training.max_depth.to_le_bytes());
    hasher.update(training.seed.to_le_bytes());
    hasher.update(training.holdout_ratio.to_le_bytes());
    hasher.update(embedding.dim.to_le_bytes());
    hasher.update(embedding.min_ngram.to_le_bytes());
    hasher.update(embedding.max_ngram.to_le_bytes());

    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
