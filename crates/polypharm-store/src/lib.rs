//! Reference data for the interaction pipeline: the drug name catalog, the
//! structure table and the historical co-prescription reports.
//!
//! All three stores load once from CSV at startup and are immutable
//! afterwards, so they can sit behind an `Arc` with no locking.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

mod catalog;
mod reports;

pub use catalog::{DrugCatalog, StructureTable};
pub use reports::{InteractionReport, ReportStore};

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{column}' is missing")]
    MissingColumn { column: String },

    #[error("malformed drug list '{value}' in report row {row}")]
    MalformedMemberList { value: String, row: usize },
}

/// DrugBank accession, e.g. `DB00316`. Comparison and hashing are exact;
/// whitespace is trimmed on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrugId(String);

impl DrugId {
    pub fn new(id: impl Into<String>) -> Self {
        DrugId(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DrugId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub(crate) fn read_file(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| StoreError::MissingColumn {
            column: column.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drug_id_trims_on_construction() {
        assert_eq!(DrugId::new("  DB00316 ").as_str(), "DB00316");
        assert_eq!(DrugId::new("DB00316"), DrugId::new(" DB00316"));
    }
}
