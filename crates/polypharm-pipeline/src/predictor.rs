//! The prediction entry point: reference tables, featurizer and scorer
//! wired together behind one synchronous API.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use polypharm_store::{DrugCatalog, DrugId, InteractionReport, ReportStore, StructureTable};

use crate::featurize::{mean_pool, DrugFeaturizer, FeatureSchema};
use crate::scorer::InteractionScorer;
use crate::{PredictError, Result};

/// Model output for one drug combination.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Distinct member drugs, in query order.
    pub members: Vec<DrugId>,
    pub probability: f64,
    pub interaction: bool,
}

/// Prediction for one unordered pair out of a larger combination.
#[derive(Debug, Clone, Serialize)]
pub struct PairScore {
    pub pair: [DrugId; 2],
    pub probability: f64,
    pub interaction: bool,
}

/// Everything the display layer needs for one query: the combination
/// prediction, a score for each two-drug subset, and the historical
/// reports containing all queried drugs.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionCheck {
    pub prediction: Prediction,
    pub pairwise: Vec<PairScore>,
    pub known_reports: Vec<InteractionReport>,
}

/// Scores drug combinations against the trained interaction model.
///
/// All inputs are immutable after construction, so one predictor can be
/// shared across threads behind an `Arc`.
pub struct InteractionPredictor {
    catalog: Arc<DrugCatalog>,
    structures: Arc<StructureTable>,
    reports: Arc<ReportStore>,
    featurizer: DrugFeaturizer,
    scorer: InteractionScorer,
}

impl InteractionPredictor {
    /// Fails when the featurizer's output width does not match the width
    /// the model was trained on. Catching that here turns a silent
    /// garbage-prediction bug into a startup error.
    pub fn new(
        catalog: Arc<DrugCatalog>,
        structures: Arc<StructureTable>,
        reports: Arc<ReportStore>,
        featurizer: DrugFeaturizer,
        scorer: InteractionScorer,
    ) -> Result<Self> {
        let schema = featurizer.schema();
        if schema.drug_dimension() != scorer.num_features() {
            return Err(PredictError::DimensionMismatch {
                expected: scorer.num_features(),
                actual: schema.drug_dimension(),
            });
        }
        Ok(InteractionPredictor {
            catalog,
            structures,
            reports,
            featurizer,
            scorer,
        })
    }

    /// Maps display names to DrugBank IDs. Lookup is case and whitespace
    /// insensitive; the first unknown name aborts the query.
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<DrugId>> {
        names
            .iter()
            .map(|name| {
                self.catalog
                    .resolve(name.as_ref())
                    .cloned()
                    .ok_or_else(|| PredictError::NotFound {
                        what: "drug name",
                        key: name.as_ref().trim().to_string(),
                    })
            })
            .collect()
    }

    /// Scores one combination. Duplicate ids are dropped (first
    /// occurrence wins) and at least two distinct drugs must remain.
    /// Any failure aborts the whole query; there are no partial results.
    pub fn predict(&self, ids: &[DrugId], threshold: Option<f64>) -> Result<Prediction> {
        let (members, features) = self.prepare(ids)?;
        let pooled = mean_pool(&features)?;
        let scored = self.scorer.score(&pooled, threshold)?;
        debug!(
            members = members.len(),
            probability = scored.probability,
            interaction = scored.interaction,
            "scored combination"
        );
        Ok(Prediction {
            members,
            probability: scored.probability,
            interaction: scored.interaction,
        })
    }

    pub fn predict_names<S: AsRef<str>>(
        &self,
        names: &[S],
        threshold: Option<f64>,
    ) -> Result<Prediction> {
        let ids = self.resolve_names(names)?;
        self.predict(&ids, threshold)
    }

    /// Historical reports whose member sets contain every queried drug,
    /// cloned for the caller, in table order.
    pub fn known_reports(&self, ids: &[DrugId]) -> Vec<InteractionReport> {
        self.reports
            .find_superset_reports(ids)
            .into_iter()
            .cloned()
            .collect()
    }

    /// The full answer for one query: the overall prediction, a score for
    /// every two-drug subset, and matching historical reports. Each member
    /// is featurized once and reused across subsets.
    pub fn check<S: AsRef<str>>(
        &self,
        names: &[S],
        threshold: Option<f64>,
    ) -> Result<InteractionCheck> {
        let ids = self.resolve_names(names)?;
        let (members, features) = self.prepare(&ids)?;

        let pooled = mean_pool(&features)?;
        let overall = self.scorer.score(&pooled, threshold)?;

        let mut pairwise = Vec::with_capacity(members.len() * (members.len() - 1) / 2);
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let pooled = mean_pool(&[features[i].as_slice(), features[j].as_slice()])?;
                let scored = self.scorer.score(&pooled, threshold)?;
                pairwise.push(PairScore {
                    pair: [members[i].clone(), members[j].clone()],
                    probability: scored.probability,
                    interaction: scored.interaction,
                });
            }
        }

        let known_reports = self.known_reports(&members);
        debug!(
            members = members.len(),
            pairs = pairwise.len(),
            reports = known_reports.len(),
            "completed interaction check"
        );
        Ok(InteractionCheck {
            prediction: Prediction {
                members,
                probability: overall.probability,
                interaction: overall.interaction,
            },
            pairwise,
            known_reports,
        })
    }

    /// Name catalog, exposed for search endpoints.
    pub fn catalog(&self) -> &DrugCatalog {
        &self.catalog
    }

    pub fn schema(&self) -> FeatureSchema {
        self.featurizer.schema()
    }

    /// Default decision threshold.
    pub fn threshold(&self) -> f64 {
        self.scorer.threshold()
    }

    pub fn structure_count(&self) -> usize {
        self.structures.len()
    }

    pub fn report_count(&self) -> usize {
        self.reports.len()
    }

    /// Dedups, enforces the minimum group size and featurizes every
    /// member. All structures are resolved before any model work so an
    /// unknown drug aborts the query without wasted inference.
    fn prepare(&self, ids: &[DrugId]) -> Result<(Vec<DrugId>, Vec<Vec<f32>>)> {
        let members = dedup_preserving_order(ids);
        if members.len() < 2 {
            return Err(PredictError::TooFewMembers {
                got: members.len(),
            });
        }

        let mut resolved = Vec::with_capacity(members.len());
        for id in &members {
            let smiles = self
                .structures
                .smiles(id)
                .ok_or_else(|| PredictError::NotFound {
                    what: "structure",
                    key: id.to_string(),
                })?;
            resolved.push((id, smiles));
        }

        let features = resolved
            .into_iter()
            .map(|(id, smiles)| self.featurizer.featurize(id, smiles))
            .collect::<Result<Vec<_>>>()?;
        Ok((members, features))
    }
}

/// Keeps the first occurrence of each id, dropping later repeats.
fn dedup_preserving_order(ids: &[DrugId]) -> Vec<DrugId> {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut members = Vec::with_capacity(ids.len());
    for id in ids {
        if seen.insert(id) {
            members.push(id.clone());
        }
    }
    members
}
