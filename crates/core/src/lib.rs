pub mod error;
pub mod normalize;
pub mod types;

pub use error::EngineError;
pub use normalize::{normalize_location, normalize_merchant};
pub use types::{
    BrandMap, LocationPrediction, MatchSource, MerchantRecord, PredictionResult,
    DEFAULT_REGION, NOT_DOMESTIC, UNKNOWN_CATEGORY,
};
