use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};

use masruf_engine::{
    brand_map_from_records, load_brand_records, CategorizationEngine, CorpusStore, EngineConfig,
    Gazetteer,
};
use masruf_storage::SqliteCorpusStore;

#[derive(Parser, Debug)]
#[command(name = "masruf", version, about = "Merchant categorization and location inference")]
struct Cli {
    /// Application database.
    #[arg(long, default_value = "masruf.db", global = true)]
    db: PathBuf,

    /// Optional engine config (TOML). Defaults apply otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Optional gazetteer CSV (municipality, governorate). The compiled-in
    /// table is used otherwise.
    #[arg(long, global = true)]
    gazetteer: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a merchant/category CSV into the brand corpus
    Import {
        /// Two-column CSV with a header row: raw merchant name, category
        #[arg(long)]
        corpus: PathBuf,
    },

    /// Score a one-column CSV of raw merchant names offline
    Score {
        /// Input CSV with a header row; the first column is the raw name
        #[arg(long)]
        input: PathBuf,

        /// Output CSV of per-row predictions
        #[arg(long)]
        output: PathBuf,
    },

    /// Apply one category correction and retrain
    Correct {
        /// Raw merchant name as it appeared in the feed
        #[arg(long)]
        merchant: String,

        /// The category it should have been
        #[arg(long)]
        category: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let gazetteer = load_gazetteer(cli.gazetteer.as_deref())?;

    let pool = masruf_storage::create_db(&cli.db)
        .await
        .with_context(|| format!("failed to open database {}", cli.db.display()))?;
    masruf_storage::seed_default_categories(&pool).await?;
    let store = SqliteCorpusStore::new(pool);

    match cli.command {
        Command::Import { corpus } => import_corpus(&store, &corpus).await,
        Command::Score { input, output } => {
            score_file(store, gazetteer, config, &input, &output).await
        }
        Command::Correct { merchant, category } => {
            correct(store, gazetteer, config, &merchant, &category).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Ok(EngineConfig::from_toml(&content)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn load_gazetteer(path: Option<&Path>) -> Result<Gazetteer> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open gazetteer {}", path.display()))?;
            Ok(Gazetteer::from_csv_reader(file)?)
        }
        None => Ok(Gazetteer::builtin()),
    }
}

async fn import_corpus(store: &SqliteCorpusStore, corpus_path: &Path) -> Result<()> {
    let file = File::open(corpus_path)
        .with_context(|| format!("failed to open corpus {}", corpus_path.display()))?;
    let records = load_brand_records(file)?;
    let brand_map = brand_map_from_records(records);
    masruf_storage::replace_brand_corpus(store.pool(), &brand_map).await?;
    println!("imported {} merchants into the brand corpus", brand_map.len());
    Ok(())
}

async fn score_file(
    store: SqliteCorpusStore,
    gazetteer: Gazetteer,
    config: EngineConfig,
    input: &Path,
    output: &Path,
) -> Result<()> {
    let engine = CategorizationEngine::bootstrap(store, gazetteer, config)
        .await
        .context("engine bootstrap failed — run `masruf import` first?")?;

    let file =
        File::open(input).with_context(|| format!("failed to open input {}", input.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);
    let mut names = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(name) = record.get(0) {
            if !name.trim().is_empty() {
                names.push(name.to_string());
            }
        }
    }
    tracing::info!(rows = names.len(), "scoring input file");

    let predictions = engine.classify_batch(&names);

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("failed to create output {}", output.display()))?;
    writer.write_record([
        "affil_name",
        "category",
        "cat_confidence",
        "localization",
        "loc_confidence",
    ])?;
    for (name, (category, location)) in names.iter().zip(&predictions) {
        writer.write_record([
            name.as_str(),
            category.category_label.as_str(),
            &format!("{:.2}", category.confidence),
            location.region.as_str(),
            &location
                .confidence
                .map(|c| format!("{c:.2}"))
                .unwrap_or_default(),
        ])?;
    }
    writer.flush()?;

    println!(
        "scored {} merchants into {} (snapshot {})",
        names.len(),
        output.display(),
        engine.snapshot_version()
    );
    Ok(())
}

async fn correct(
    store: SqliteCorpusStore,
    gazetteer: Gazetteer,
    config: EngineConfig,
    merchant: &str,
    category: &str,
) -> Result<()> {
    let engine = CategorizationEngine::bootstrap(store, gazetteer, config)
        .await
        .context("engine bootstrap failed — run `masruf import` first?")?;

    if engine
        .store()
        .category_exists(category)
        .await
        .ok()
        .flatten()
        .is_none()
    {
        tracing::warn!(category = %category, "correction uses a category not in the categories table");
    }

    let outcome = engine.apply_correction(merchant, category).await?;
    println!(
        "corrected '{}' → '{}' (snapshot {})",
        outcome.normalized_merchant, outcome.category, outcome.snapshot_version
    );
    Ok(())
}
