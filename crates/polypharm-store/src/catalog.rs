//! Name and structure lookups backed by the two reference CSVs.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::{column_index, read_file, DrugId, Result};

/// Maps drug names to DrugBank IDs, sourced from `drug_info.csv`.
///
/// Names are compared after trimming, dropping stray double quotes and
/// lowercasing, so `" Aspirin "` and `aspirin` resolve alike. When the
/// file lists a name twice the last row wins.
#[derive(Debug, Clone, Default)]
pub struct DrugCatalog {
    by_name: HashMap<String, DrugId>,
}

impl DrugCatalog {
    pub fn from_csv_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_file(path.as_ref())?;
        let catalog = Self::from_csv(&content)?;
        info!(
            entries = catalog.len(),
            path = %path.as_ref().display(),
            "loaded drug catalog"
        );
        Ok(catalog)
    }

    /// Parses catalog CSV content with `name_x` and `drugbank-id` columns.
    /// Rows with a blank name or ID are skipped.
    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let headers = reader.headers()?.clone();
        let name_col = column_index(&headers, "name_x")?;
        let id_col = column_index(&headers, "drugbank-id")?;

        let mut by_name = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let name = record.get(name_col).map(normalize_name).unwrap_or_default();
            let id = record.get(id_col).map(str::trim).unwrap_or_default();
            if name.is_empty() || id.is_empty() {
                continue;
            }
            by_name.insert(name, DrugId::new(id));
        }
        Ok(DrugCatalog { by_name })
    }

    /// Resolves a user-facing name to its DrugBank ID, applying the same
    /// normalization the catalog was built with.
    pub fn resolve(&self, name: &str) -> Option<&DrugId> {
        self.by_name.get(normalize_name(name).as_str())
    }

    /// Case-insensitive substring search over catalog names, sorted
    /// alphabetically and capped at `limit` entries.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(String, DrugId)> {
        let needle = normalize_name(query);
        let mut hits: Vec<(String, DrugId)> = self
            .by_name
            .iter()
            .filter(|(name, _)| name.contains(&needle))
            .map(|(name, id)| (name.clone(), id.clone()))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        hits.truncate(limit);
        hits
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Maps DrugBank IDs to SMILES strings, sourced from
/// `DrugBankID2SMILES.csv`. Rows missing either value are dropped.
#[derive(Debug, Clone, Default)]
pub struct StructureTable {
    by_id: HashMap<DrugId, String>,
}

impl StructureTable {
    pub fn from_csv_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_file(path.as_ref())?;
        let table = Self::from_csv(&content)?;
        info!(
            entries = table.len(),
            path = %path.as_ref().display(),
            "loaded structure table"
        );
        Ok(table)
    }

    /// Parses structure CSV content with `drugbank_id` and `smiles`
    /// columns.
    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let headers = reader.headers()?.clone();
        let id_col = column_index(&headers, "drugbank_id")?;
        let smiles_col = column_index(&headers, "smiles")?;

        let mut by_id = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let id = record.get(id_col).map(str::trim).unwrap_or_default();
            let smiles = record.get(smiles_col).map(str::trim).unwrap_or_default();
            if id.is_empty() || smiles.is_empty() {
                continue;
            }
            by_id.insert(DrugId::new(id), smiles.to_string());
        }
        Ok(StructureTable { by_id })
    }

    pub fn smiles(&self, id: &DrugId) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn normalize_name(raw: &str) -> String {
    raw.trim().replace('"', "").to_lowercase()
}
