//! Failure handling and concurrency behavior of the correction pipeline.

use std::sync::Arc;
use std::time::Duration;

use masruf_core::{EngineError, MatchSource};
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

async fn engine(store: MemoryStore) -> CategorizationEngine<MemoryStore> {
    CategorizationEngine::bootstrap(store, Gazetteer::builtin(), test_config())
        .await
        .unwrap()
}

#[tokio::test]
async fn failed_publish_leaves_the_old_state_live() {
    let engine = engine(seeded_store()).await;
    let version_before = engine.snapshot_version();
    let corpus_before = engine.store().persisted_corpus();

    engine.store().fail_next_persist();
    let result = engine.apply_correction("Carrefour Market", "groceries").await;
    assert!(matches!(result, Err(EngineError::RetrainFailure(_))));

    // The merge was part of the failed attempt: nothing changed anywhere.
    assert_eq!(engine.snapshot_version(), version_before);
    assert_eq!(engine.store().persisted_corpus(), corpus_before);
    let served = engine.classify("carrefour market");
    assert_eq!(served.category_label, "courses");
}

#[tokio::test]
async fn failed_correction_can_be_retried() {
    let engine = engine(seeded_store()).await;
    engine.store().fail_next_persist();
    assert!(engine
        .apply_correction("Carrefour Market", "groceries")
        .await
        .is_err());

    // The guard was released on failure; the retry goes through.
    let outcome = engine
        .apply_correction("Carrefour Market", "groceries")
        .await
        .unwrap();
    assert_eq!(outcome.category, "groceries");
    assert_eq!(engine.classify("carrefour market").category_label, "groceries");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_correction_mid_retrain_is_rejected() {
    let store = seeded_store();
    store.set_publish_delay(Duration::from_millis(400));
    let engine = Arc::new(engine(store).await);

    let background = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .apply_correction("Carrefour Market", "groceries")
                .await
        })
    };

    // Give the first correction time to take the retrain guard and park
    // inside the delayed publish.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let second = engine.apply_correction("monoprix", "shopping").await;
    assert!(matches!(second, Err(EngineError::RetrainInProgress)));

    background.await.unwrap().unwrap();

    // Once the first publish lands, a retry of the second succeeds.
    let outcome = engine.apply_correction("monoprix", "shopping").await.unwrap();
    assert_eq!(outcome.category, "shopping");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn readers_never_observe_a_half_published_state() {
    let store = seeded_store();
    store.set_publish_delay(Duration::from_millis(300));
    let engine = Arc::new(engine(store).await);

    // "livres" is a brand-new label: before the publish neither the brand
    // map nor the codec knows it, afterwards both do. A mixed state would
    // show one without the other.
    let before = engine.classify("librairie mille feuilles");
    assert_ne!(before.category_label, "livres");

    let background = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .apply_correction("librairie mille feuilles", "livres")
                .await
        })
    };

    while !background.is_finished() {
        let state = engine.current_state();
        let map_knows = state.brand_map.contains_key("librairie mille feuilles");
        let codec_knows = state.snapshot.codec.contains("livres");
        assert_eq!(
            map_knows, codec_knows,
            "observed a brand map and codec from different snapshots"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    background.await.unwrap().unwrap();

    let state = engine.current_state();
    assert!(state.brand_map.contains_key("librairie mille feuilles"));
    assert!(state.snapshot.codec.contains("livres"));

    let after = engine.classify("librairie mille feuilles");
    assert_eq!(after.category_label, "livres");
    assert_eq!(after.source, MatchSource::Exact);
    assert!(after.confidence >= 0.85);
}
