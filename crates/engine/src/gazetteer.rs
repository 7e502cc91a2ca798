//! Static municipality → governorate reference table and the locality
//! inference built on top of it.

use std::collections::BTreeMap;
use std::io::Read;
use thiserror::Error;

use masruf_core::{normalize_location, LocationPrediction, DEFAULT_REGION};

use crate::confidence::round2;
use crate::fuzzy::{best_match, MatcherConfig, Scorer};

/// Country codes treated as domestic in affiliation strings.
const DOMESTIC_CODES: [&str; 2] = ["TUN", "TN"];

/// Compiled-in reference table (uppercase municipality, uppercase
/// governorate). A fuller table can be loaded from CSV at startup; this one
/// covers the municipalities that actually show up in card affiliations.
pub const DEFAULT_GAZETTEER: &[(&str, &str)] = &[
    ("TUNIS", "TUNIS"),
    ("LA MARSA", "TUNIS"),
    ("LA GOULETTE", "TUNIS"),
    ("CARTHAGE", "TUNIS"),
    ("SIDI BOU SAID", "TUNIS"),
    ("LE BARDO", "TUNIS"),
    ("EL MENZAH", "TUNIS"),
    ("EL OMRANE", "TUNIS"),
    ("ARIANA VILLE", "ARIANA"),
    ("LA SOUKRA", "ARIANA"),
    ("RAOUED", "ARIANA"),
    ("ETTADHAMEN", "ARIANA"),
    ("BEN AROUS", "BEN AROUS"),
    ("RADES", "BEN AROUS"),
    ("EZZAHRA", "BEN AROUS"),
    ("HAMMAM LIF", "BEN AROUS"),
    ("MEGRINE", "BEN AROUS"),
    ("EL MOUROUJ", "BEN AROUS"),
    ("MORNAG", "BEN AROUS"),
    ("MANOUBA", "MANOUBA"),
    ("DEN DEN", "MANOUBA"),
    ("OUED ELLIL", "MANOUBA"),
    ("BIZERTE", "BIZERTE"),
    ("MENZEL BOURGUIBA", "BIZERTE"),
    ("MATEUR", "BIZERTE"),
    ("RAS JEBEL", "BIZERTE"),
    ("NABEUL", "NABEUL"),
    ("HAMMAMET", "NABEUL"),
    ("KELIBIA", "NABEUL"),
    ("KORBA", "NABEUL"),
    ("GROMBALIA", "NABEUL"),
    ("ZAGHOUAN", "ZAGHOUAN"),
    ("BEJA", "BEJA"),
    ("MEDJEZ EL BAB", "BEJA"),
    ("JENDOUBA", "JENDOUBA"),
    ("TABARKA", "JENDOUBA"),
    ("LE KEF", "KEF"),
    ("DAHMANI", "KEF"),
    ("SILIANA", "SILIANA"),
    ("SOUSSE", "SOUSSE"),
    ("HAMMAM SOUSSE", "SOUSSE"),
    ("MSAKEN", "SOUSSE"),
    ("KANTAOUI", "SOUSSE"),
    ("MONASTIR", "MONASTIR"),
    ("SKANES", "MONASTIR"),
    ("MOKNINE", "MONASTIR"),
    ("KSAR HELLAL", "MONASTIR"),
    ("MAHDIA", "MAHDIA"),
    ("CHEBBA", "MAHDIA"),
    ("EL JEM", "MAHDIA"),
    ("KAIROUAN", "KAIROUAN"),
    ("HAFFOUZ", "KAIROUAN"),
    ("KASSERINE", "KASSERINE"),
    ("SBEITLA", "KASSERINE"),
    ("SIDI BOUZID", "SIDI BOUZID"),
    ("REGUEB", "SIDI BOUZID"),
    ("SFAX", "SFAX"),
    ("SAKIET EZZIT", "SFAX"),
    ("EL AIN", "SFAX"),
    ("GABES", "GABES"),
    ("MARETH", "GABES"),
    ("MEDENINE", "MEDENINE"),
    ("ZARZIS", "MEDENINE"),
    ("HOUMT SOUK", "MEDENINE"),
    ("MIDOUN", "MEDENINE"),
    ("TATAOUINE", "TATAOUINE"),
    ("GAFSA", "GAFSA"),
    ("METLAOUI", "GAFSA"),
    ("TOZEUR", "TOZEUR"),
    ("NEFTA", "TOZEUR"),
    ("KEBILI", "KEBILI"),
    ("DOUZ", "KEBILI"),
];

#[derive(Debug, Error)]
pub enum GazetteerError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {0} does not have municipality and governorate columns")]
    MissingColumns(usize),
    #[error("gazetteer has no entries")]
    Empty,
}

/// Immutable municipality → governorate table, loaded once at startup and
/// shared read-only for the life of the process.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    map: BTreeMap<String, String>,
}

impl Gazetteer {
    /// Build from (municipality, governorate) pairs; keys and values are
    /// uppercased and trimmed.
    pub fn new<I, A, B>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let map = entries
            .into_iter()
            .map(|(municipality, governorate)| {
                (
                    municipality.as_ref().trim().to_uppercase(),
                    governorate.as_ref().trim().to_uppercase(),
                )
            })
            .filter(|(municipality, _)| !municipality.is_empty())
            .collect();
        Gazetteer { map }
    }

    /// The compiled-in table.
    pub fn builtin() -> Self {
        Gazetteer::new(DEFAULT_GAZETTEER.iter().copied())
    }

    /// Load from a two-column CSV (municipality, governorate) with a header
    /// row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, GazetteerError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut entries = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            let municipality = record.get(0).ok_or(GazetteerError::MissingColumns(row))?;
            let governorate = record.get(1).ok_or(GazetteerError::MissingColumns(row))?;
            entries.push((municipality.to_string(), governorate.to_string()));
        }
        let gazetteer = Gazetteer::new(entries);
        if gazetteer.is_empty() {
            return Err(GazetteerError::Empty);
        }
        Ok(gazetteer)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, municipality: &str) -> Option<&str> {
        self.map
            .get(municipality.trim().to_uppercase().as_str())
            .map(String::as_str)
    }

    /// Infer the governorate for an affiliation string.
    ///
    /// The affiliation ends in a country code segment; anything non-domestic
    /// short-circuits. The locality segment is normalized and fuzzy-matched
    /// against the municipality keys. Unresolvable localities fall back to
    /// the capital region at a confidence low enough for downstream
    /// consumers to filter out.
    pub fn predict_governorate(
        &self,
        affiliation: &str,
        config: &MatcherConfig,
    ) -> LocationPrediction {
        let parts: Vec<&str> = affiliation.split('>').collect();
        let country = parts
            .last()
            .map(|p| p.trim().to_uppercase())
            .unwrap_or_default();
        if !DOMESTIC_CODES.contains(&country.as_str()) {
            return LocationPrediction::not_domestic();
        }

        let raw_locality = if parts.len() >= 2 {
            parts[parts.len() - 2]
        } else {
            parts[0]
        };
        let locality = normalize_location(raw_locality);

        match best_match(&locality, self.map.keys().map(String::as_str), Scorer::TokenSet) {
            Some((municipality, score))
                if score >= config.strong_location_threshold
                    || score >= config.weak_location_threshold =>
            {
                // Both tiers currently resolve to the same expression; they
                // are kept distinct because they are tuned independently.
                LocationPrediction {
                    region: self.map[municipality].clone(),
                    confidence: Some(round2(score / 100.0)),
                }
            }
            Some((_, score)) => {
                tracing::debug!(
                    locality = %locality,
                    score,
                    "locality below match threshold; defaulting to capital"
                );
                LocationPrediction {
                    region: DEFAULT_REGION.to_string(),
                    confidence: Some(0.6),
                }
            }
            None => LocationPrediction {
                region: DEFAULT_REGION.to_string(),
                confidence: Some(0.5),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MatcherConfig {
        MatcherConfig::default()
    }

    #[test]
    fn builtin_table_is_populated() {
        let gazetteer = Gazetteer::builtin();
        assert!(gazetteer.len() > 40);
        assert_eq!(gazetteer.get("la marsa"), Some("TUNIS"));
        assert_eq!(gazetteer.get("ZARZIS"), Some("MEDENINE"));
    }

    #[test]
    fn known_municipality_matches_with_high_confidence() {
        let gazetteer = Gazetteer::builtin();
        let prediction = gazetteer.predict_governorate("SomeShop>LA MARSA>TUN", &config());
        assert_eq!(prediction.region, "TUNIS");
        assert!(prediction.confidence.unwrap() >= 0.9);
    }

    #[test]
    fn foreign_country_code_short_circuits() {
        let gazetteer = Gazetteer::builtin();
        let prediction = gazetteer.predict_governorate("SomeShop>Paris>FR", &config());
        assert_eq!(prediction, LocationPrediction::not_domestic());
    }

    #[test]
    fn both_domestic_codes_are_accepted() {
        let gazetteer = Gazetteer::builtin();
        for code in ["TUN", "TN", "tn"] {
            let prediction =
                gazetteer.predict_governorate(&format!("Shop>HAMMAMET>{code}"), &config());
            assert_eq!(prediction.region, "NABEUL");
        }
    }

    #[test]
    fn gibberish_locality_defaults_to_capital_weakly() {
        let gazetteer = Gazetteer::builtin();
        let prediction = gazetteer.predict_governorate("Shop>XQZWV>TUN", &config());
        assert_eq!(prediction.region, DEFAULT_REGION);
        assert_eq!(prediction.confidence, Some(0.6));
    }

    #[test]
    fn empty_gazetteer_defaults_to_capital_weakest() {
        let gazetteer = Gazetteer::new(Vec::<(&str, &str)>::new());
        let prediction = gazetteer.predict_governorate("Shop>LA MARSA>TUN", &config());
        assert_eq!(prediction.region, DEFAULT_REGION);
        assert_eq!(prediction.confidence, Some(0.5));
    }

    #[test]
    fn noise_words_in_locality_still_resolve() {
        let gazetteer = Gazetteer::builtin();
        // "AGENCE" is stripped by location normalization before matching.
        let prediction = gazetteer.predict_governorate("BT>AGENCE HAMMAMET>TUN", &config());
        assert_eq!(prediction.region, "NABEUL");
        assert!(prediction.confidence.unwrap() >= 0.9);
    }

    #[test]
    fn single_segment_affiliation_uses_that_segment() {
        let gazetteer = Gazetteer::builtin();
        // No locality segment at all: the country segment doubles as the
        // locality and fails to match anything.
        let prediction = gazetteer.predict_governorate("TN", &config());
        assert_eq!(prediction.region, DEFAULT_REGION);
    }

    #[test]
    fn csv_round_trip() {
        let csv = "municipality,governorate\nLA MARSA,TUNIS\nZARZIS,MEDENINE\n";
        let gazetteer = Gazetteer::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(gazetteer.len(), 2);
        assert_eq!(gazetteer.get("LA MARSA"), Some("TUNIS"));
    }

    #[test]
    fn empty_csv_is_an_error() {
        let csv = "municipality,governorate\n";
        assert!(matches!(
            Gazetteer::from_csv_reader(csv.as_bytes()),
            Err(GazetteerError::Empty)
        ));
    }
}
