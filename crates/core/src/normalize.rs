//! Deterministic text cleanup for merchant names and locality tokens.
//!
//! Both functions are pure and idempotent: feeding a normalized string back
//! in returns it unchanged. That property is what makes normalized names
//! usable as stable lookup keys in the brand map and the gazetteer.

use regex::Regex;
use std::sync::LazyLock;

/// Everything that is not a word character, whitespace or `&` becomes a
/// space. `&` survives because it is load-bearing in brand names ("M&S").
static RE_MERCHANT_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s&]").expect("invalid regex"));

/// Standalone legal-entity tokens carried by Tunisian merchant descriptors.
static RE_LEGAL_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(ste|sas|societe|ets|ltd|llc|inc)\b").expect("invalid regex"));

/// City names that show up inside merchant descriptors and would otherwise
/// dominate fuzzy token matching.
static RE_CITY_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(tunis|sfax|sousse|nabeul|monastir|gabes|kairouan|ben arous|bizerte|gafsa|medenine|beja|jendouba|kasserine|kebili|mahdia|siliana|tozeur|zaghouan|manouba|tatouine|ariana)\b",
    )
    .expect("invalid regex")
});

static RE_LOCATION_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("invalid regex"));

/// Administrative and generic noise words seen in bank locality fields:
/// street/route prefixes, agency/branch markers, business-type words.
static RE_LOCATION_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(LE|MEDINA|DE|DES|CITE|CARREFOUR|LA|AV|RTE|ROUTE|AVENUE|AGENCE|AG|BOX|BT|DAB|HL|STE|SOCIETE|COMPTOIR|KIOSQUE|GARE|G|SARL|SPA|EURL|SNACK|CAFE|ET|HOTEL|MALL|PHARMACIE|STATION|BANQUE|MOVENPICK|INTERNET|SMART|SOLUTIONS|FERCHICHI)\b",
    )
    .expect("invalid regex")
});

static RE_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid regex"));

/// Normalize a raw merchant descriptor into a stable lowercase key.
///
/// Hierarchical descriptors like `CARREFOUR MARKET>LA MARSA>TUN` keep only
/// the first segment — the rest is locality/country routing handled by the
/// governorate inferrer.
pub fn normalize_merchant(raw: &str) -> String {
    let head = raw.split('>').next().unwrap_or(raw);
    let lowered = head.to_lowercase();
    let depunctuated = RE_MERCHANT_PUNCT.replace_all(&lowered, " ");
    let no_legal = RE_LEGAL_TOKENS.replace_all(&depunctuated, "");
    let no_cities = RE_CITY_TOKENS.replace_all(&no_legal, "");
    RE_SPACES.replace_all(&no_cities, " ").trim().to_string()
}

/// Normalize a raw locality token into the uppercase form used as a
/// gazetteer query.
pub fn normalize_location(raw: &str) -> String {
    let uppered = raw.to_uppercase();
    let depunctuated = RE_LOCATION_PUNCT.replace_all(&uppered, " ");
    let no_noise = RE_LOCATION_NOISE.replace_all(&depunctuated, "");
    RE_SPACES.replace_all(&no_noise, " ").trim().to_string()
}
