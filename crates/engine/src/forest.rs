//! Bagged decision-tree ensemble used as the fallback classifier.
//!
//! Each tree is fit on a bootstrap resample of the training embeddings; a
//! prediction is the majority vote, and the vote fraction doubles as the
//! class probability. The whole ensemble is rebuilt from scratch on every
//! retrain — the label space may have changed, so there is nothing safe to
//! update incrementally.

use linfa::prelude::*;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForestError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("ensemble size must be at least 1")]
    NoTrees,
    #[error("tree fit failed: {0}")]
    TreeFit(String),
}

/// Knobs for the retraining step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of bootstrap trees in the ensemble.
    pub n_trees: usize,
    /// Depth cap per tree.
    pub max_depth: usize,
    /// Seed for the bootstrap resampling and the train/held-out split.
    /// Fixed so a given corpus always trains to the same model.
    pub seed: u64,
    /// Fraction of the corpus held out of training.
    pub holdout_ratio: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            n_trees: 300,
            max_depth: 50,
            seed: 42,
            holdout_ratio: 0.2,
        }
    }
}

/// A fitted ensemble over `n_classes` dense class indices.
pub struct ForestClassifier {
    trees: Vec<DecisionTree<f64, usize>>,
    n_classes: usize,
}

impl ForestClassifier {
    /// Fit a fresh ensemble. `targets` must hold class indices below
    /// `n_classes`.
    pub fn fit(
        records: &Array2<f64>,
        targets: &Array1<usize>,
        n_classes: usize,
        config: &TrainingConfig,
    ) -> Result<Self, ForestError> {
        if records.nrows() == 0 || n_classes == 0 {
            return Err(ForestError::EmptyTrainingSet);
        }
        if config.n_trees == 0 {
            return Err(ForestError::NoTrees);
        }

        let n = records.nrows();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut trees = Vec::with_capacity(config.n_trees);

        for _ in 0..config.n_trees {
            let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let sample_records = records.select(Axis(0), &indices);
            let sample_targets = targets.select(Axis(0), &indices);
            let dataset = Dataset::new(sample_records, sample_targets);

            let tree = DecisionTree::params()
                .max_depth(Some(config.max_depth))
                .fit(&dataset)
                .map_err(|e| ForestError::TreeFit(e.to_string()))?;
            trees.push(tree);
        }

        Ok(ForestClassifier { trees, n_classes })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Predict one embedded name: `(class index, vote fraction)`.
    pub fn predict_one(&self, features: &[f64]) -> (usize, f64) {
        let records = Array2::from_shape_vec((1, features.len()), features.to_vec())
            .expect("row construction cannot fail for a single feature vector");
        self.predict_with_proba(&records)[0]
    }

    /// Predict each row: `(class index, vote fraction)` per row. Ties go to
    /// the lowest class index.
    pub fn predict_with_proba(&self, records: &Array2<f64>) -> Vec<(usize, f64)> {
        let mut votes = vec![vec![0_usize; self.n_classes]; records.nrows()];
        for tree in &self.trees {
            let predicted: Array1<usize> = tree.predict(records);
            for (row, &class) in predicted.iter().enumerate() {
                if class < self.n_classes {
                    votes[row][class] += 1;
                }
            }
        }

        votes
            .into_iter()
            .map(|row| {
                let (best_class, best_votes) = row
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
                    .unwrap_or((0, &0));
                (best_class, *best_votes as f64 / self.trees.len() as f64)
            })
            .collect()
    }

    /// Fraction of `targets` predicted correctly.
    pub fn accuracy(&self, records: &Array2<f64>, targets: &Array1<usize>) -> f64 {
        if targets.is_empty() {
            return 0.0;
        }
        let hits = self
            .predict_with_proba(records)
            .iter()
            .zip(targets.iter())
            .filter(|((predicted, _), &expected)| *predicted == expected)
            .count();
        hits as f64 / targets.len() as f64
    }
}
