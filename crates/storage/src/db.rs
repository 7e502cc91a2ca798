use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use thiserror::Error;

use masruf_core::{BrandMap, MerchantRecord};
use masruf_engine::SnapshotMeta;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("snapshot serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Categories seeded on first run: the labels the corpus and the correction
/// UI agree on, with their display icons.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("courses", "🛒"),
    ("restaurants", "🍽️"),
    ("transport", "🚌"),
    ("banque", "🏦"),
    ("shopping", "🛍️"),
    ("sante", "💊"),
    ("factures", "💡"),
    ("telecom", "📱"),
    ("loisirs", "🎬"),
    ("voyage", "✈️"),
    ("education", "🎓"),
    ("services", "🔧"),
];

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS brand_corpus (
            normalized_name TEXT PRIMARY KEY,
            category TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            icon TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS classifier_snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version TEXT NOT NULL UNIQUE,
            meta TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn seed_default_categories(pool: &DbPool) -> Result<(), sqlx::Error> {
    for (name, icon) in DEFAULT_CATEGORIES {
        sqlx::query("INSERT OR IGNORE INTO categories (name, icon) VALUES (?, ?)")
            .bind(name)
            .bind(icon)
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn get_brand_corpus(pool: &DbPool) -> Result<Vec<MerchantRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT normalized_name, category FROM brand_corpus ORDER BY normalized_name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(normalized_name, category)| MerchantRecord {
            raw_name: normalized_name.clone(),
            normalized_name,
            category_label: category,
        })
        .collect())
}

/// Full rewrite of the corpus table inside one transaction.
pub async fn replace_brand_corpus(pool: &DbPool, brand_map: &BrandMap) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM brand_corpus")
        .execute(&mut *tx)
        .await?;
    for (normalized_name, category) in brand_map {
        sqlx::query("INSERT INTO brand_corpus (normalized_name, category) VALUES (?, ?)")
            .bind(normalized_name)
            .bind(category)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await
}

pub async fn insert_snapshot_meta(pool: &DbPool, meta: &SnapshotMeta) -> Result<(), StorageError> {
    let serialized = serde_json::to_string(meta)?;
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
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recently inserted snapshot record, if any.
pub async fn get_latest_snapshot(pool: &DbPool) -> Result<Option<SnapshotMeta>, StorageError> {
    let row = sqlx::query("SELECT meta FROM classifier_snapshots ORDER BY id DESC LIMIT 1")
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => {
            let meta: String = row.get(0);
            Ok(Some(serde_json::from_str(&meta)?))
        }
        None => Ok(None),
    }
}

pub async fn category_id(pool: &DbPool, label: &str) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query("SELECT id FROM categories WHERE LOWER(name) = LOWER(?) LIMIT 1")
        .bind(label.trim())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get(0)))
}

pub async fn upsert_category(pool: &DbPool, name: &str, icon: &str) -> Result<i64, sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO categories (name, icon) VALUES (?, ?)")
        .bind(name)
        .bind(icon)
        .execute(pool)
        .await?;
    let row = sqlx::query("SELECT id FROM categories WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(row.get(0))
}
