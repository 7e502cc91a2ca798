//! SQLite implementation of the engine's collaborator seam.

use async_trait::async_trait;

use masruf_core::{BrandMap, EngineError, MerchantRecord};
use masruf_engine::{CorpusStore, SnapshotMeta};

use crate::db::{self, DbPool};

/// Durable corpus + snapshot store backed by the application database.
#[derive(Clone)]
pub struct SqliteCorpusStore {
    pool: DbPool,
}

impl SqliteCorpusStore {
    pub fn new(pool: DbPool) -> Self {
        SqliteCorpusStore { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn storage_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Storage(e.to_string())
}

#[async_trait]
impl CorpusStore for SqliteCorpusStore {
    async fn get_brand_corpus(&self) -> Result<Vec<MerchantRecord>, EngineError> {
        db::get_brand_corpus(&self.pool).await.map_err(storage_err)
    }

    async fn persist_brand_corpus(&self, brand_map: &BrandMap) -> Result<(), EngineError> {
        db::replace_brand_corpus(&self.pool, brand_map)
            .await
            .map_err(storage_err)
    }

    async fn persist_classifier_snapshot(&self, meta: &SnapshotMeta) -> Result<(), EngineError> {
        db::insert_snapshot_meta(&self.pool, meta)
            .await
            .map_err(storage_err)
    }

    async fn category_exists(&self, label: &str) -> Result<Option<i64>, EngineError> {
        db::category_id(&self.pool, label).await.map_err(storage_err)
    }

    /// Corpus rewrite and snapshot record in one transaction, so a published
    /// unit is durable all-or-nothing.
    async fn persist_published_unit(
        &self,
        brand_map: &BrandMap,
        meta: &SnapshotMeta,
    ) -> Result<(), EngineError> {
        let serialized = serde_json::to_string(meta).map_err(storage_err)?;
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        sqlx::query("DELETE FROM brand_corpus")
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        for (normalized_name, category) in brand_map {
            sqlx::query("INSERT INTO brand_corpus (normalized_name, category) VALUES (?, ?)")
                .bind(normalized_name)
                .bind(category)
                .execute(&mut *tx)
                .await
                .map_err(storage_err)?;
        }
        sqlx::query(
            r#"
            INSERT INTO classifier_snapshots (version, meta, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(version) DO UPDATE SET meta = excluded.meta
            "#,
        )
        .bind(&meta.version)
        .bind(serialized)
        .bind(meta.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;
        tracing::info!(version = %meta.version, corpus = brand_map.len(), "published unit persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use masruf_engine::{EmbeddingConfig, TrainingConfig};

    async fn store() -> (tempfile::TempDir, SqliteCorpusStore) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::create_db(&dir.path().join("masruf.db")).await.unwrap();
        db::seed_default_categories(&pool).await.unwrap();
        (dir, SqliteCorpusStore::new(pool))
    }

    fn meta(version: &str) -> SnapshotMeta {
        SnapshotMeta {
            version: version.to_string(),
            created_at: Utc::now(),
            labels: vec!["courses".to_string()],
            corpus_size: 1,
            heldout_accuracy: None,
            training: TrainingConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }

    #[tokio::test]
    async fn implements_the_engine_seam() {
        let (_dir, store) = store().await;

        let mut map = BrandMap::new();
        map.insert("monoprix".to_string(), "courses".to_string());
        store.persist_brand_corpus(&map).await.unwrap();

        let corpus = store.get_brand_corpus().await.unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].category_label, "courses");

        assert!(store.category_exists("courses").await.unwrap().is_some());
        assert!(store.category_exists("autre").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn published_unit_lands_as_one_piece() {
        let (_dir, store) = store().await;

        let mut map = BrandMap::new();
        map.insert("monoprix".to_string(), "courses".to_string());
        map.insert("atb dab".to_string(), "banque".to_string());
        store.persist_published_unit(&map, &meta("v1")).await.unwrap();

        assert_eq!(store.get_brand_corpus().await.unwrap().len(), 2);
        let latest = db::get_latest_snapshot(store.pool()).await.unwrap().unwrap();
        assert_eq!(latest.version, "v1");
    }
}
