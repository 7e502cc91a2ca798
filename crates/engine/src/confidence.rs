//! Confidence unification: one `[0, 1]` scale with comparable semantics no
//! matter which stage of the cascade produced the match.

use masruf_core::MatchSource;

/// Fixed discount applied to model probabilities. A learned prediction is
/// inherently less certain than a dictionary or fuzzy hit of the same
/// nominal score, and the discount keeps the two regimes comparable.
pub const MODEL_DISCOUNT: f64 = 0.75;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Map a raw per-source score onto the unified scale.
///
/// - `Exact` ignores the raw value: a verbatim dictionary hit is certain.
/// - Fuzzy sources carry a similarity in `[0, 100]`.
/// - `Model` carries a class probability in `[0, 1]`.
pub fn unify(source: MatchSource, raw: f64) -> f64 {
    match source {
        MatchSource::Exact => 1.0,
        MatchSource::FuzzyWhole | MatchSource::FuzzyToken => {
            round2((raw / 100.0).clamp(0.0, 1.0))
        }
        MatchSource::Model => round2((raw * MODEL_DISCOUNT).clamp(0.0, 1.0)),
    }
}
