//! Collaborator seam to the durable layer.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use masruf_core::{BrandMap, EngineError, MerchantRecord};

use crate::snapshot::SnapshotMeta;

/// Durable storage consumed by the engine.
///
/// Each write is assumed atomic at the storage layer;
/// [`persist_published_unit`](CorpusStore::persist_published_unit) is the
/// publish-time entry point and implementations that can should make the
/// corpus + snapshot pair a single transaction.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Full current knowledge base.
    async fn get_brand_corpus(&self) -> Result<Vec<MerchantRecord>, EngineError>;

    /// Replace the durable corpus with `brand_map`.
    async fn persist_brand_corpus(&self, brand_map: &BrandMap) -> Result<(), EngineError>;

    /// Record a snapshot's provenance metadata.
    async fn persist_classifier_snapshot(&self, meta: &SnapshotMeta) -> Result<(), EngineError>;

    /// Category lookup used by the insertion path of the caller.
    async fn category_exists(&self, label: &str) -> Result<Option<i64>, EngineError>;

    /// Persist corpus + snapshot as one published unit.
    async fn persist_published_unit(
        &self,
        brand_map: &BrandMap,
        meta: &SnapshotMeta,
    ) -> Result<(), EngineError> {
        self.persist_brand_corpus(brand_map).await?;
        self.persist_classifier_snapshot(meta).await
    }
}

/// In-memory store for tests and ephemeral runs.
///
/// Mirrors the mock-backend pattern of the OCR recognizer: the real SQLite
/// store lives in `masruf-storage`, this one keeps everything in a mutex and
/// adds two injection knobs — a forced persist failure and a publish delay —
/// for exercising the retrain pipeline's failure and concurrency behavior.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    fail_next_persist: AtomicBool,
    publish_delay: Mutex<Option<Duration>>,
}

#[derive(Default)]
struct MemoryInner {
    records: Vec<MerchantRecord>,
    snapshots: Vec<SnapshotMeta>,
    categories: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Seed with (normalized merchant, category) pairs.
    pub fn with_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let store = MemoryStore::new();
        {
            let mut inner = store.inner.lock().expect("memory store lock poisoned");
            for (name, category) in pairs {
                inner.records.push(MerchantRecord {
                    raw_name: name.as_ref().to_string(),
                    normalized_name: name.as_ref().to_string(),
                    category_label: category.as_ref().to_string(),
                });
                let label = category.as_ref().to_string();
                if !inner.categories.contains(&label) {
                    inner.categories.push(label);
                }
            }
        }
        store
    }

    /// Make the next publish fail with a storage error.
    pub fn fail_next_persist(&self) {
        self.fail_next_persist.store(true, Ordering::SeqCst);
    }

    /// Sleep this long inside every publish, to widen the window in which
    /// concurrent readers run against the old snapshot.
    pub fn set_publish_delay(&self, delay: Duration) {
        *self.publish_delay.lock().expect("memory store lock poisoned") = Some(delay);
    }

    pub fn persisted_snapshots(&self) -> Vec<SnapshotMeta> {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .snapshots
            .clone()
    }

    pub fn persisted_corpus(&self) -> Vec<MerchantRecord> {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .records
            .clone()
    }

    fn take_injected_failure(&self) -> Result<(), EngineError> {
        if self.fail_next_persist.swap(false, Ordering::SeqCst) {
            return Err(EngineError::Storage("injected persist failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CorpusStore for MemoryStore {
    async fn get_brand_corpus(&self) -> Result<Vec<MerchantRecord>, EngineError> {
        Ok(self.persisted_corpus())
    }

    async fn persist_brand_corpus(&self, brand_map: &BrandMap) -> Result<(), EngineError> {
        self.take_injected_failure()?;
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.records = brand_map
            .iter()
            .map(|(name, category)| MerchantRecord {
                raw_name: name.clone(),
                normalized_name: name.clone(),
                category_label: category.clone(),
            })
            .collect();
        Ok(())
    }

    async fn persist_classifier_snapshot(&self, meta: &SnapshotMeta) -> Result<(), EngineError> {
        self.take_injected_failure()?;
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.snapshots.push(meta.clone());
        Ok(())
    }

    async fn category_exists(&self, label: &str) -> Result<Option<i64>, EngineError> {
        let needle = label.trim().to_lowercase();
        let inner = self.inner.lock().expect("memory store lock poisoned");
        Ok(inner
            .categories
            .iter()
            .position(|c| c.trim().to_lowercase() == needle)
            .map(|i| i as i64 + 1))
    }

    async fn persist_published_unit(
        &self,
        brand_map: &BrandMap,
        meta: &SnapshotMeta,
    ) -> Result<(), EngineError> {
        let delay = *self.publish_delay.lock().expect("memory store lock poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.take_injected_failure()?;
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        inner.records = brand_map
            .iter()
            .map(|(name, category)| MerchantRecord {
                raw_name: name.clone(),
                normalized_name: name.clone(),
                category_label: category.clone(),
            })
            .collect();
        inner.snapshots.push(meta.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_pairs_round_trip() {
        let store = MemoryStore::with_pairs([("monoprix", "courses"), ("atb dab", "banque")]);
        let corpus = store.get_brand_corpus().await.unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(store.category_exists("courses").await.unwrap(), Some(1));
        assert_eq!(store.category_exists("BANQUE").await.unwrap(), Some(2));
        assert_eq!(store.category_exists("voyage").await.unwrap(), None);
    }

    #[tokio::test]
    async fn persist_replaces_corpus() {
        let store = MemoryStore::with_pairs([("monoprix", "courses")]);
        let mut map = BrandMap::new();
        map.insert("aziza".to_string(), "courses".to_string());
        store.persist_brand_corpus(&map).await.unwrap();
        let corpus = store.get_brand_corpus().await.unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].normalized_name, "aziza");
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let store = MemoryStore::new();
        store.fail_next_persist();
        let map = BrandMap::new();
        assert!(store.persist_brand_corpus(&map).await.is_err());
        assert!(store.persist_brand_corpus(&map).await.is_ok());
    }
}
