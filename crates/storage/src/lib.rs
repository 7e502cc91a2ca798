pub mod db;
pub mod store;

pub use db::{
    category_id, create_db, get_brand_corpus, get_latest_snapshot, insert_snapshot_meta,
    replace_brand_corpus, seed_default_categories, upsert_category, DbPool, StorageError,
    DEFAULT_CATEGORIES,
};
pub use store::SqliteCorpusStore;
