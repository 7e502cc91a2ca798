//! Engine facade: concurrent read-only prediction over an immutable state,
//! single-writer retraining with atomic publish.

use std::sync::{Arc, RwLock};

use masruf_core::{
    normalize_merchant, BrandMap, EngineError, LocationPrediction, PredictionResult,
};

use crate::classifier::predict_category;
use crate::config::EngineConfig;
use crate::embed::{Embedder, HashingEmbedder};
use crate::gazetteer::Gazetteer;
use crate::retrain::{train_snapshot, RetrainPhase};
use crate::snapshot::ClassifierSnapshot;
use crate::store::CorpusStore;

/// One internally consistent (brand map, snapshot) pair.
///
/// Built off to the side and published with a single reference swap; the
/// fields of a live state are never mutated.
pub struct EngineState {
    pub brand_map: BrandMap,
    pub snapshot: ClassifierSnapshot,
}

/// What a successful correction produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionOutcome {
    pub normalized_merchant: String,
    pub category: String,
    pub snapshot_version: String,
}

/// Merchant categorization and location inference over a swappable state.
///
/// Readers (`classify`, `infer_region`, `classify_batch`) clone the current
/// `Arc<EngineState>` and never block each other. `apply_correction` is the
/// single writer: it serializes against itself and publishes a brand-new
/// state with one atomic replace.
pub struct CategorizationEngine<S: CorpusStore> {
    store: S,
    gazetteer: Gazetteer,
    config: EngineConfig,
    embedder: Arc<dyn Embedder>,
    state: RwLock<Arc<EngineState>>,
    retrain_guard: tokio::sync::Mutex<()>,
}

impl<S: CorpusStore> CategorizationEngine<S> {
    /// Load the corpus, train the initial snapshot, and only then start
    /// serving. Fails with `ResourceUnavailable` when either reference
    /// table is missing — no categorization is possible without them.
    pub async fn bootstrap(
        store: S,
        gazetteer: Gazetteer,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let embedder: Arc<dyn Embedder> =
            Arc::new(HashingEmbedder::new(config.embedding.clone()));
        Self::bootstrap_with_embedder(store, gazetteer, config, embedder).await
    }

    /// Bootstrap with a custom embedding backend.
    pub async fn bootstrap_with_embedder(
        store: S,
        gazetteer: Gazetteer,
        config: EngineConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, EngineError> {
        if gazetteer.is_empty() {
            return Err(EngineError::ResourceUnavailable(
                "gazetteer has no entries".to_string(),
            ));
        }

        let records = store
            .get_brand_corpus()
            .await
            .map_err(|e| EngineError::ResourceUnavailable(e.to_string()))?;
        let brand_map = crate::corpus::brand_map_from_records(records);
        if brand_map.is_empty() {
            return Err(EngineError::ResourceUnavailable(
                "brand corpus is empty".to_string(),
            ));
        }

        let snapshot = train_snapshot(
            &brand_map,
            embedder.clone(),
            &config.training,
            &config.embedding,
        )
        .map_err(|e| EngineError::ResourceUnavailable(e.to_string()))?;

        tracing::info!(
            corpus = brand_map.len(),
            labels = snapshot.codec.len(),
            version = %snapshot.version,
            "engine bootstrapped"
        );

        Ok(CategorizationEngine {
            store,
            gazetteer,
            config,
            embedder,
            state: RwLock::new(Arc::new(EngineState {
                brand_map,
                snapshot,
            })),
            retrain_guard: tokio::sync::Mutex::new(()),
        })
    }

    /// The state every call in this request should read from. Holding the
    /// returned `Arc` keeps that state fully consistent even across a
    /// concurrent publish.
    pub fn current_state(&self) -> Arc<EngineState> {
        self.state.read().expect("engine state lock poisoned").clone()
    }

    /// Version digest of the live snapshot.
    pub fn snapshot_version(&self) -> String {
        self.current_state().snapshot.version.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Categorize one raw merchant string. Never fails; degraded inputs get
    /// the unknown sentinel.
    pub fn classify(&self, raw_merchant_name: &str) -> PredictionResult {
        let state = self.current_state();
        predict_category(raw_merchant_name, &state, &self.config)
    }

    /// Infer the governorate for an affiliation string.
    pub fn infer_region(&self, affiliation: &str) -> LocationPrediction {
        self.gazetteer
            .predict_governorate(affiliation, &self.config.matcher)
    }

    /// Offline scoring of a whole file: every row is processed
    /// independently against one consistent state, and no row's outcome
    /// affects any other's.
    pub fn classify_batch<I, T>(&self, raw_names: I) -> Vec<(PredictionResult, LocationPrediction)>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let state = self.current_state();
        raw_names
            .into_iter()
            .map(|raw| {
                let raw = raw.as_ref();
                (
                    predict_category(raw, &state, &self.config),
                    self.gazetteer
                        .predict_governorate(raw, &self.config.matcher),
                )
            })
            .collect()
    }

    /// Apply a user correction: merge it into the brand map, retrain from
    /// scratch, persist, and publish the new state.
    ///
    /// At most one correction is processed at a time; a second one arriving
    /// mid-retrain is rejected with `RetrainInProgress` so the caller can
    /// retry. On any failure the previously published state stays live and
    /// the correction is reported as not applied.
    pub async fn apply_correction(
        &self,
        raw_merchant_name: &str,
        correct_category: &str,
    ) -> Result<CorrectionOutcome, EngineError> {
        let _guard = self
            .retrain_guard
            .try_lock()
            .map_err(|_| EngineError::RetrainInProgress)?;

        // Merging
        let merchant = normalize_merchant(raw_merchant_name);
        let category = correct_category.trim().to_lowercase();
        if merchant.is_empty() {
            return Err(EngineError::RetrainFailure(
                "corrected merchant name normalizes to empty".to_string(),
            ));
        }
        if category.is_empty() {
            return Err(EngineError::RetrainFailure(
                "corrected category is empty".to_string(),
            ));
        }
        tracing::info!(
            phase = %RetrainPhase::Merging,
            merchant = %merchant,
            category = %category,
            "correction received"
        );
        let previous = self.current_state();
        let mut brand_map = previous.brand_map.clone();
        brand_map.insert(merchant.clone(), category.clone());

        // Retraining — off to the side; the live state is untouched until
        // the publish below succeeds.
        tracing::info!(phase = %RetrainPhase::Retraining, corpus = brand_map.len(), "retraining from scratch");
        let snapshot = train_snapshot(
            &brand_map,
            self.embedder.clone(),
            &self.config.training,
            &self.config.embedding,
        )?;

        // Publishing
        tracing::info!(phase = %RetrainPhase::Publishing, version = %snapshot.version, "persisting published unit");
        let meta = snapshot.meta(brand_map.len());
        self.store
            .persist_published_unit(&brand_map, &meta)
            .await
            .map_err(|e| EngineError::RetrainFailure(format!("publish failed: {e}")))?;

        let outcome = CorrectionOutcome {
            normalized_merchant: merchant,
            category,
            snapshot_version: snapshot.version.clone(),
        };
        {
            let mut live = self.state.write().expect("engine state lock poisoned");
            *live = Arc::new(EngineState {
                brand_map,
                snapshot,
            });
        }
        tracing::info!(version = %outcome.snapshot_version, "new snapshot live");
        Ok(outcome)
    }
}
