//! Text embedding backends for the learned-model fallback.
//!
//! The engine only requires a fixed-size numeric vector per merchant name;
//! the backend is a seam so a heavier encoder can be plugged in without
//! touching the classifier.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Abstraction over a text-embedding backend.
///
/// Implementations must be deterministic: the same text always produces the
/// same vector, across process restarts, because published snapshots are
/// reproduced from the corpus by retraining.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f64>;

    /// Embed a batch into an `(n, dim)` matrix.
    fn embed_batch(&self, texts: &[&str]) -> Array2<f64> {
        let dim = self.dim();
        let mut flat = Vec::with_capacity(texts.len() * dim);
        for text in texts {
            flat.extend(self.embed(text));
        }
        Array2::from_shape_vec((texts.len(), dim), flat)
            .expect("embedder returned a vector of the wrong dimension")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Output dimensionality of the hashed feature vector.
    pub dim: usize,
    /// Smallest character n-gram hashed per token.
    pub min_ngram: usize,
    /// Largest character n-gram hashed per token.
    pub max_ngram: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            dim: 128,
            min_ngram: 2,
            max_ngram: 3,
        }
    }
}

/// Character n-gram + word-token feature hashing into a fixed dimension,
/// L2-normalized. Tokens are padded with `\x01` markers so prefixes and
/// suffixes hash differently from mid-word n-grams.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    config: EmbeddingConfig,
}

impl HashingEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        HashingEmbedder { config }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.config.dim
    }

    fn embed(&self, text: &str) -> Vec<f64> {
        let dim = self.config.dim;
        let mut vector = vec![0.0_f64; dim];

        for token in text.split_whitespace() {
            bump(&mut vector, token.as_bytes());

            let padded: Vec<char> = std::iter::once('\x01')
                .chain(token.chars())
                .chain(std::iter::once('\x01'))
                .collect();
            for width in self.config.min_ngram..=self.config.max_ngram {
                if padded.len() < width {
                    continue;
                }
                for window in padded.windows(width) {
                    let gram: String = window.iter().collect();
                    bump(&mut vector, gram.as_bytes());
                }
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

fn bump(vector: &mut [f64], feature: &[u8]) {
    let hash = fnv1a64(feature);
    let slot = (hash % vector.len() as u64) as usize;
    // High bit picks the sign so colliding features partially cancel
    // instead of always inflating the same slot.
    let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
    vector[slot] += sign;
}

/// FNV-1a. The std hasher is not guaranteed stable across releases, and the
/// embedding must hash identically forever for snapshots to be reproducible.
fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
