//! Brand corpus loading and shaping.

use std::io::Read;
use thiserror::Error;

use masruf_core::{normalize_merchant, BrandMap, MerchantRecord};

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {0} does not have merchant and category columns")]
    MissingColumns(usize),
}

/// Load merchant/category records from a two-column CSV with a header row.
///
/// Merchant names are normalized on load; category labels are lowercased
/// and trimmed. Rows whose merchant name normalizes to nothing are dropped.
pub fn load_brand_records<R: Read>(reader: R) -> Result<Vec<MerchantRecord>, CorpusError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let raw_name = record.get(0).ok_or(CorpusError::MissingColumns(row))?;
        let category = record.get(1).ok_or(CorpusError::MissingColumns(row))?;

        let normalized_name = normalize_merchant(raw_name);
        if normalized_name.is_empty() {
            continue;
        }
        records.push(MerchantRecord {
            raw_name: raw_name.to_string(),
            normalized_name,
            category_label: category.trim().to_lowercase(),
        });
    }
    Ok(records)
}

/// Collapse records into the lookup/training map. A later record for the
/// same normalized name supersedes an earlier one.
pub fn brand_map_from_records<I>(records: I) -> BrandMap
where
    I: IntoIterator<Item = MerchantRecord>,
{
    records
        .into_iter()
        .filter(|r| !r.normalized_name.is_empty())
        .map(|r| (r.normalized_name, r.category_label))
        .collect()
}
