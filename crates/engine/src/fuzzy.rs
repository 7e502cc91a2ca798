//! Cascading fuzzy matcher shared by merchant and locality lookup.
//!
//! Two scorers, both over `[0, 100]`:
//! - [`token_set_ratio`] compares the token *sets* of two strings, so word
//!   order and repetitions don't matter ("market carrefour" ≈ "carrefour
//!   market").
//! - [`partial_ratio`] scores the best-aligned window of the longer string
//!   against the shorter one, so a brand embedded in POS terminal noise
//!   still scores high.

use masruf_core::normalize_merchant;
use masruf_core::MatchSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

/// Threshold table for the cascade. One instance parameterizes both the
/// merchant and the locality call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Whole-string matches must clear this bar (0–100).
    pub whole_threshold: f64,
    /// Per-token matches are inherently noisier and get a looser bar.
    pub token_threshold: f64,
    /// Locality matches at or above this score are strong hits.
    pub strong_location_threshold: f64,
    /// Locality matches at or above this score are still accepted.
    pub weak_location_threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            whole_threshold: 85.0,
            token_threshold: 75.0,
            strong_location_threshold: 90.0,
            weak_location_threshold: 70.0,
        }
    }
}

/// Which similarity formula to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scorer {
    TokenSet,
    Partial,
}

impl Scorer {
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Scorer::TokenSet => token_set_ratio(a, b),
            Scorer::Partial => partial_ratio(a, b),
        }
    }
}

/// Token-order-independent similarity over `[0, 100]`.
///
/// The token sets are split into the shared part and each side's remainder;
/// the score is the best Levenshtein ratio among the three pairings of
/// (shared), (shared + rest of a), (shared + rest of b). A query whose
/// tokens are a subset of the candidate's scores 100.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let shared: Vec<&str> = ta.intersection(&tb).copied().collect();
    let only_a: Vec<&str> = ta.difference(&tb).copied().collect();
    let only_b: Vec<&str> = tb.difference(&ta).copied().collect();

    let base = shared.join(" ");
    let with_a = join_parts(&base, &only_a);
    let with_b = join_parts(&base, &only_b);

    let r1 = normalized_levenshtein(&base, &with_a);
    let r2 = normalized_levenshtein(&base, &with_b);
    let r3 = normalized_levenshtein(&with_a, &with_b);
    100.0 * r1.max(r2).max(r3)
}

fn join_parts(base: &str, rest: &[&str]) -> String {
    if rest.is_empty() {
        base.to_string()
    } else if base.is_empty() {
        rest.join(" ")
    } else {
        format!("{} {}", base, rest.join(" "))
    }
}

/// Substring-tolerant similarity over `[0, 100]`: the shorter string is slid
/// across the longer one and the best window ratio wins. An exact substring
/// therefore scores 100 regardless of the surrounding noise.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let long_chars: Vec<char> = long.chars().collect();
    let short_len = short.chars().count();
    if short_len == long_chars.len() {
        return 100.0 * normalized_levenshtein(short, long);
    }

    let mut best = 0.0_f64;
    for start in 0..=(long_chars.len() - short_len) {
        let window: String = long_chars[start..start + short_len].iter().collect();
        let ratio = normalized_levenshtein(short, &window);
        if ratio > best {
            best = ratio;
            if best >= 1.0 {
                break;
            }
        }
    }
    100.0 * best
}

/// Highest-scoring candidate, or `None` when `candidates` is empty.
/// The first candidate wins ties.
pub fn best_match<'a, I>(query: &str, candidates: I, scorer: Scorer) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let score = scorer.score(query, candidate);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best
}

/// Result of running the brand cascade.
#[derive(Debug, Clone, PartialEq)]
pub enum BrandLookup {
    /// A known brand cleared one of the fuzzy tiers.
    Matched {
        candidate: String,
        score: f64,
        source: MatchSource,
    },
    /// Nothing conclusive — the caller should fall through to the model.
    /// Carries the normalized input so the model sees the cleaned form.
    Fallback(String),
}

/// Cascading brand lookup against the known-brand list.
///
/// 1. Whole-string token-set match; accepted at `whole_threshold`.
/// 2. Per-token partial match; every token clearing `token_threshold` is
///    collected and the single best one wins.
/// 3. Otherwise fall back to the model.
pub fn match_known_brand<'a, I>(raw: &str, known: I, config: &MatcherConfig) -> BrandLookup
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    let cleaned = normalize_merchant(raw);

    if let Some((candidate, score)) =
        best_match(&cleaned, known.clone(), Scorer::TokenSet)
    {
        if score >= config.whole_threshold {
            return BrandLookup::Matched {
                candidate: candidate.to_string(),
                score,
                source: MatchSource::FuzzyWhole,
            };
        }
    }

    let mut best_token: Option<(&str, f64)> = None;
    for token in cleaned.split_whitespace() {
        if let Some((candidate, score)) = best_match(token, known.clone(), Scorer::Partial) {
            if score >= config.token_threshold {
                match best_token {
                    Some((_, best_score)) if score <= best_score => {}
                    _ => best_token = Some((candidate, score)),
                }
            }
        }
    }
    if let Some((candidate, score)) = best_token {
        return BrandLookup::Matched {
            candidate: candidate.to_string(),
            score,
            source: MatchSource::FuzzyToken,
        };
    }

    BrandLookup::Fallback(cleaned)
}
