//! The prediction cascade: exact → fuzzy → model, scored on one scale.

use masruf_core::{normalize_merchant, MatchSource, PredictionResult};

use crate::config::EngineConfig;
use crate::confidence::unify;
use crate::engine::EngineState;
use crate::fuzzy::{match_known_brand, token_set_ratio, BrandLookup};

/// Categorize one raw merchant string against a consistent engine state.
///
/// Never fails: inputs that normalize to nothing get the unknown sentinel,
/// and a model miss (empty codec, undecodable index) degrades the same way.
pub fn predict_category(raw: &str, state: &EngineState, config: &EngineConfig) -> PredictionResult {
    let cleaned = normalize_merchant(raw);
    if cleaned.is_empty() {
        tracing::warn!(raw = %raw, "merchant name normalized to empty; returning unknown sentinel");
        return PredictionResult::unknown();
    }

    // 1. Verbatim dictionary hit — no similarity math needed.
    if let Some(label) = state.brand_map.get(&cleaned) {
        return finish(label.clone(), MatchSource::Exact, 100.0, config);
    }

    // 2. Fuzzy cascade over the known brands.
    let known = state.brand_map.keys().map(String::as_str);
    match match_known_brand(&cleaned, known, &config.matcher) {
        BrandLookup::Matched {
            candidate, source, ..
        } => {
            // The served confidence is the whole-string similarity to the
            // matched key, even for token-tier matches: a token hit against
            // a mostly-dissimilar string deserves a low score.
            let similarity = token_set_ratio(&cleaned, &candidate);
            match state.brand_map.get(&candidate) {
                Some(label) => finish(label.clone(), source, similarity, config),
                None => PredictionResult::unknown(),
            }
        }
        // 3. Learned-model fallback.
        BrandLookup::Fallback(name) => match state.snapshot.predict(&name) {
            Some((label, proba)) => {
                tracing::debug!(
                    name = %name,
                    label = %label,
                    proba,
                    "no brand match; served model fallback"
                );
                finish(label, MatchSource::Model, proba, config)
            }
            None => PredictionResult::unknown(),
        },
    }
}

fn finish(label: String, source: MatchSource, raw: f64, config: &EngineConfig) -> PredictionResult {
    let confidence = unify(source, raw);
    let is_cash_withdrawal = label == config.cash_category;
    PredictionResult {
        category_label: label,
        confidence,
        source,
        is_cash_withdrawal,
    }
}
