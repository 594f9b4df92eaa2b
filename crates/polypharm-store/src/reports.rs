//! Historical co-prescription reports and superset matching.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{column_index, read_file, DrugId, Result, StoreError};

/// One row of `combined.csv`: a reported drug combination with its
/// provenance. `time` is kept verbatim; the source data mixes timestamp
/// formats and the value is only ever displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionReport {
    pub report_id: String,
    pub time: String,
    pub label: String,
    pub members: Vec<DrugId>,
}

/// All known interaction reports, in file order.
#[derive(Debug, Clone, Default)]
pub struct ReportStore {
    reports: Vec<InteractionReport>,
}

impl ReportStore {
    pub fn from_csv_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_file(path.as_ref())?;
        let store = Self::from_csv(&content)?;
        info!(
            reports = store.len(),
            path = %path.as_ref().display(),
            "loaded interaction reports"
        );
        Ok(store)
    }

    /// Parses report CSV content with `DrugBankID`, `report_id`, `time`
    /// and `hyperedge_label` columns. The `DrugBankID` cell holds a
    /// bracketed list such as `['DB00001', 'DB00002']`.
    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let headers = reader.headers()?.clone();
        let members_col = column_index(&headers, "DrugBankID")?;
        let report_col = column_index(&headers, "report_id")?;
        let time_col = column_index(&headers, "time")?;
        let label_col = column_index(&headers, "hyperedge_label")?;

        let mut reports = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let raw_members = record.get(members_col).unwrap_or_default();
            let members = parse_id_list(raw_members).ok_or_else(|| {
                StoreError::MalformedMemberList {
                    value: raw_members.to_string(),
                    // Header is row zero in the file itself.
                    row: row + 1,
                }
            })?;
            reports.push(InteractionReport {
                report_id: record.get(report_col).unwrap_or_default().trim().to_string(),
                time: record.get(time_col).unwrap_or_default().trim().to_string(),
                label: record.get(label_col).unwrap_or_default().trim().to_string(),
                members,
            });
        }
        Ok(ReportStore { reports })
    }

    /// Returns every report whose member set contains all queried drugs,
    /// preserving file order. The query being a subset is enough; reports
    /// may include additional drugs. An empty query matches every report.
    pub fn find_superset_reports(&self, query: &[DrugId]) -> Vec<&InteractionReport> {
        self.reports
            .iter()
            .filter(|report| query.iter().all(|id| report.members.contains(id)))
            .collect()
    }

    pub fn reports(&self) -> &[InteractionReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

/// Parses the bracketed ID list format, e.g. `['DB01', 'DB02']` or
/// `["DB01"]` or `[]`. Returns `None` when the brackets or quoting are
/// broken.
fn parse_id_list(raw: &str) -> Option<Vec<DrugId>> {
    let inner = raw.trim().strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }
    let mut ids = Vec::new();
    for token in inner.split(',') {
        let token = token.trim();
        let unquoted = token
            .strip_prefix('\'')
            .and_then(|t| t.strip_suffix('\''))
            .or_else(|| token.strip_prefix('"').and_then(|t| t.strip_suffix('"')))?;
        if unquoted.is_empty() {
            return None;
        }
        ids.push(DrugId::new(unquoted));
    }
    Some(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORTS_CSV: &str = "\
DrugBankID,report_id,time,hyperedge_label
\"['DB00945', 'DB00682']\",R1,2014Q3,1
\"['DB00945', 'DB00682', 'DB00331']\",R2,2015Q1,1
\"['DB00331']\",R3,2016Q2,0
\"[]\",R4,2016Q4,0
";

    fn ids(raw: &[&str]) -> Vec<DrugId> {
        raw.iter().copied().map(DrugId::new).collect()
    }

    #[test]
    fn parses_rows_and_member_lists() {
        let store = ReportStore::from_csv(REPORTS_CSV).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(store.reports()[0].report_id, "R1");
        assert_eq!(store.reports()[0].members, ids(&["DB00945", "DB00682"]));
        assert_eq!(store.reports()[3].members, Vec::<DrugId>::new());
    }

    #[test]
    fn double_quoted_lists_parse_too() {
        let csv = "DrugBankID,report_id,time,hyperedge_label\n\"[\"\"DB01\"\", \"\"DB02\"\"]\",R9,t,1\n";
        let store = ReportStore::from_csv(csv).unwrap();
        assert_eq!(store.reports()[0].members, ids(&["DB01", "DB02"]));
    }

    #[test]
    fn matching_requires_query_to_be_a_subset() {
        let store = ReportStore::from_csv(REPORTS_CSV).unwrap();

        let hits = store.find_superset_reports(&ids(&["DB00945", "DB00682"]));
        let report_ids: Vec<&str> = hits.iter().map(|r| r.report_id.as_str()).collect();
        assert_eq!(report_ids, vec!["R1", "R2"]);

        // Supersets of a report's members do not match it.
        let hits = store.find_superset_reports(&ids(&["DB00945", "DB00682", "DB00331", "DB09999"]));
        assert!(hits.is_empty());
    }

    #[test]
    fn single_drug_queries_match_every_containing_report() {
        let store = ReportStore::from_csv(REPORTS_CSV).unwrap();
        let hits = store.find_superset_reports(&ids(&["DB00331"]));
        let report_ids: Vec<&str> = hits.iter().map(|r| r.report_id.as_str()).collect();
        assert_eq!(report_ids, vec!["R2", "R3"]);
    }

    #[test]
    fn disjoint_queries_match_nothing() {
        let store = ReportStore::from_csv(REPORTS_CSV).unwrap();
        assert!(store.find_superset_reports(&ids(&["DB99999"])).is_empty());
    }

    #[test]
    fn malformed_member_lists_name_the_row() {
        let csv = "DrugBankID,report_id,time,hyperedge_label\n\"['DB01'\",R1,t,1\n";
        let err = ReportStore::from_csv(csv).unwrap_err();
        match err {
            StoreError::MalformedMemberList { row, .. } => assert_eq!(row, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = ReportStore::from_csv("DrugBankID,report_id,time\n[],a,b\n").unwrap_err();
        assert!(matches!(err, StoreError::MissingColumn { .. }));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.csv");
        std::fs::write(&path, REPORTS_CSV).unwrap();
        let store = ReportStore::from_csv_file(&path).unwrap();
        assert_eq!(store.len(), 4);
    }
}
