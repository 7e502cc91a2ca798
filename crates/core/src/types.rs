use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category label served when nothing in the cascade can say anything useful.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Region sentinel for affiliations whose country code is not a domestic one.
pub const NOT_DOMESTIC: &str = "NOT_DOMESTIC";

/// Capital region used as the fail-safe when a locality cannot be resolved.
pub const DEFAULT_REGION: &str = "TUNIS";

/// Ordered lookup table `normalized merchant name → category label`.
///
/// This is both the exact/fuzzy match dictionary and the training corpus.
/// A `BTreeMap` keeps iteration order deterministic, which keeps retraining
/// reproducible for a given corpus.
pub type BrandMap = BTreeMap<String, String>;

/// One merchant/category pair of the brand knowledge base.
///
/// At most one record exists per `normalized_name`; a later correction for
/// the same normalized name supersedes the previous record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantRecord {
    pub raw_name: String,
    pub normalized_name: String,
    /// Lowercase, trimmed category label.
    pub category_label: String,
}

/// Which stage of the cascade produced a category prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// The normalized name was a verbatim key of the brand map.
    Exact,
    /// Whole-string fuzzy match cleared the upper threshold.
    FuzzyWhole,
    /// A single token of the name matched a known brand.
    FuzzyToken,
    /// Learned-model fallback.
    Model,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSource::Exact => write!(f, "exact"),
            MatchSource::FuzzyWhole => write!(f, "fuzzy_whole"),
            MatchSource::FuzzyToken => write!(f, "fuzzy_token"),
            MatchSource::Model => write!(f, "model"),
        }
    }
}

/// Outcome of categorizing one raw merchant string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub category_label: String,
    /// Unified confidence in `[0, 1]`, comparable across sources.
    pub confidence: f64,
    pub source: MatchSource,
    /// True when the predicted category is the bank/ATM category, so the
    /// caller can ask the user to break the withdrawal down into real
    /// expenses.
    pub is_cash_withdrawal: bool,
}

impl PredictionResult {
    /// Lowest-confidence sentinel returned for inputs that normalize to
    /// nothing. Never produced by the model itself.
    pub fn unknown() -> Self {
        PredictionResult {
            category_label: UNKNOWN_CATEGORY.to_string(),
            confidence: 0.0,
            source: MatchSource::Model,
            is_cash_withdrawal: false,
        }
    }
}

/// Outcome of inferring a governorate from an affiliation string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPrediction {
    /// Governorate name, or the [`NOT_DOMESTIC`] sentinel.
    pub region: String,
    /// Absent for non-domestic affiliations.
    pub confidence: Option<f64>,
}

impl LocationPrediction {
    pub fn not_domestic() -> Self {
        LocationPrediction {
            region: NOT_DOMESTIC.to_string(),
            confidence: None,
        }
    }

    pub fn is_domestic(&self) -> bool {
        self.region != NOT_DOMESTIC
    }
}
