//! End-to-end behavior of the engine facade.

use masruf_core::{MatchSource, NOT_DOMESTIC, UNKNOWN_CATEGORY};
use masruf_engine::{
    CategorizationEngine, EngineConfig, Gazetteer, MemoryStore, TrainingConfig,
};

fn seeded_store() -> MemoryStore {
    MemoryStore::with_pairs([
        ("carrefour market", "courses"),
        ("monoprix", "courses"),
        ("aziza", "courses"),
        ("magasin general", "courses"),
        ("pharmacie centrale", "sante"),
        ("pharmacie moderne", "sante"),
        ("pharmacie du lac", "sante"),
        ("restaurant el walima", "restaurants"),
        ("restaurant dar el jeld", "restaurants"),
        ("cafe el khadra", "restaurants"),
        ("atb dab", "banque"),
        ("biat retrait", "banque"),
    ])
}

fn test_config() -> EngineConfig {
    EngineConfig {
        training: TrainingConfig {
            n_trees: 15,
            max_depth: 12,
            ..TrainingConfig::default()
        },
        ..EngineConfig::default()
    }
}

async fn engine() -> CategorizationEngine<MemoryStore> {
    CategorizationEngine::bootstrap(seeded_store(), Gazetteer::builtin(), test_config())
        .await
        .unwrap()
}

#[tokio::test]
async fn verbatim_brand_map_key_is_an_exact_hit() {
    let engine = engine().await;
    let result = engine.classify("carrefour market");
    assert_eq!(result.category_label, "courses");
    assert_eq!(result.source, MatchSource::Exact);
    assert!(result.confidence >= 0.85);
}

#[tokio::test]
async fn raw_feed_string_normalizes_to_an_exact_hit() {
    let engine = engine().await;
    let result = engine.classify("CARREFOUR MARKET>LA MARSA>TUN");
    assert_eq!(result.category_label, "courses");
    assert_eq!(result.source, MatchSource::Exact);
    assert_eq!(result.confidence, 1.0);
}

#[tokio::test]
async fn brand_embedded_in_terminal_noise_matches_by_token() {
    let engine = engine().await;
    let result = engine.classify("TPE 00812 MONOPRIX4021");
    assert_eq!(result.category_label, "courses");
    assert_eq!(result.source, MatchSource::FuzzyToken);
}

#[tokio::test]
async fn unseen_name_falls_through_to_the_model() {
    let engine = engine().await;
    let result = engine.classify("zeitouna logistics");
    assert_eq!(result.source, MatchSource::Model);
    // Model confidence is discounted, so it can never reach the fuzzy range.
    assert!(result.confidence <= 0.75);
}

#[tokio::test]
async fn empty_input_degrades_to_the_unknown_sentinel() {
    let engine = engine().await;
    for raw in ["", "   ", ">>>", "***"] {
        let result = engine.classify(raw);
        assert_eq!(result.category_label, UNKNOWN_CATEGORY);
        assert_eq!(result.confidence, 0.0);
    }
}

#[tokio::test]
async fn bank_category_flags_cash_withdrawal() {
    let engine = engine().await;
    let result = engine.classify("ATB DAB");
    assert_eq!(result.category_label, "banque");
    assert!(result.is_cash_withdrawal);

    let groceries = engine.classify("monoprix");
    assert!(!groceries.is_cash_withdrawal);
}

#[tokio::test]
async fn region_inference_distinguishes_domestic_and_foreign() {
    let engine = engine().await;

    let domestic = engine.infer_region("SomeShop>LA MARSA>TUN");
    assert_eq!(domestic.region, "TUNIS");
    assert!(domestic.confidence.unwrap() >= 0.9);

    let foreign = engine.infer_region("SomeShop>Paris>FR");
    assert_eq!(foreign.region, NOT_DOMESTIC);
    assert_eq!(foreign.confidence, None);
}

#[tokio::test]
async fn batch_rows_are_scored_independently() {
    let engine = engine().await;
    let rows = [
        "CARREFOUR MARKET>LA MARSA>TUN",
        "",
        "SomeShop>Paris>FR",
        "ATB DAB>SOUSSE>TN",
    ];
    let results = engine.classify_batch(rows);
    assert_eq!(results.len(), rows.len());

    // A degraded row does not poison its neighbours.
    assert_eq!(results[0].0.category_label, "courses");
    assert_eq!(results[1].0.category_label, UNKNOWN_CATEGORY);
    assert_eq!(results[2].1.region, NOT_DOMESTIC);
    assert_eq!(results[3].1.region, "SOUSSE");
    assert!(results[3].0.is_cash_withdrawal);
}

#[tokio::test]
async fn correction_is_served_immediately_after_retraining() {
    let engine = engine().await;

    let outcome = engine
        .apply_correction("Carrefour Market", "groceries")
        .await
        .unwrap();
    assert_eq!(outcome.normalized_merchant, "carrefour market");
    assert_eq!(outcome.category, "groceries");

    let result = engine.classify("CARREFOUR MARKET > TN");
    assert_eq!(result.category_label, "groceries");
    assert!(result.confidence >= 0.85);
    assert_ne!(result.source, MatchSource::Model);
}

#[tokio::test]
async fn correction_updates_the_durable_corpus() {
    let engine = engine().await;
    engine
        .apply_correction("LIBRAIRIE MILLE FEUILLES>LA MARSA>TUN", "Loisirs")
        .await
        .unwrap();

    let persisted = engine.store().persisted_corpus();
    let record = persisted
        .iter()
        .find(|r| r.normalized_name == "librairie mille feuilles")
        .expect("corrected record should be persisted");
    assert_eq!(record.category_label, "loisirs");

    let snapshots = engine.store().persisted_snapshots();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].version, engine.snapshot_version());
}

#[tokio::test]
async fn correction_with_empty_merchant_is_rejected() {
    let engine = engine().await;
    let err = engine.apply_correction("***", "courses").await;
    assert!(err.is_err());
}

#[tokio::test]
async fn bootstrap_requires_a_corpus() {
    let result =
        CategorizationEngine::bootstrap(MemoryStore::new(), Gazetteer::builtin(), test_config())
            .await;
    assert!(matches!(
        result.err(),
        Some(masruf_core::EngineError::ResourceUnavailable(_))
    ));
}

#[tokio::test]
async fn bootstrap_requires_a_gazetteer() {
    let empty = Gazetteer::new(Vec::<(&str, &str)>::new());
    let result = CategorizationEngine::bootstrap(seeded_store(), empty, test_config()).await;
    assert!(matches!(
        result.err(),
        Some(masruf_core::EngineError::ResourceUnavailable(_))
    ));
}
