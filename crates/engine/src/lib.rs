pub mod classifier;
pub mod config;
pub mod confidence;
pub mod corpus;
pub mod embed;
pub mod engine;
pub mod forest;
pub mod fuzzy;
pub mod gazetteer;
pub mod labels;
pub mod retrain;
pub mod snapshot;
pub mod store;

pub use classifier::predict_category;
pub use config::{ConfigError, EngineConfig};
pub use confidence::{round2, unify, MODEL_DISCOUNT};
pub use corpus::{brand_map_from_records, load_brand_records, CorpusError};
pub use embed::{Embedder, EmbeddingConfig, HashingEmbedder};
pub use engine::{CategorizationEngine, CorrectionOutcome, EngineState};
pub use forest::{ForestClassifier, ForestError, TrainingConfig};
pub use fuzzy::{
    best_match, match_known_brand, partial_ratio, token_set_ratio, BrandLookup, MatcherConfig,
    Scorer,
};
pub use gazetteer::{Gazetteer, GazetteerError, DEFAULT_GAZETTEER};
pub use labels::LabelCodec;
pub use retrain::{snapshot_version, train_snapshot, RetrainPhase};
pub use snapshot::{ClassifierSnapshot, SnapshotMeta};
pub use store::{CorpusStore, MemoryStore};
