//! Per-drug feature vectors and hyperedge pooling.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use polypharm_chem::{parse_smiles, FingerprintConfig, MorganFingerprinter};
use polypharm_store::DrugId;

use crate::{PredictError, Result, SmilesEncoder};

/// Widths of the two feature blocks every drug contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub fingerprint_bits: usize,
    pub embedding_dim: usize,
}

impl FeatureSchema {
    /// Total width of one drug's vector, fingerprint block first.
    pub fn drug_dimension(&self) -> usize {
        self.fingerprint_bits + self.embedding_dim
    }

    /// Identifier for this descriptor layout, reported by health checks.
    /// Changing the layout means retraining the model, so the version is
    /// derived from the widths rather than stored.
    pub fn version(&self) -> String {
        format!(
            "fp{}+emb{}.mean.v1",
            self.fingerprint_bits, self.embedding_dim
        )
    }
}

/// Builds one drug's feature vector: fingerprint bits concatenated with
/// the learned embedding, in that order. The scoring model was trained on
/// exactly this layout.
pub struct DrugFeaturizer {
    fingerprinter: MorganFingerprinter,
    encoder: Arc<dyn SmilesEncoder>,
}

impl DrugFeaturizer {
    pub fn new(config: FingerprintConfig, encoder: Arc<dyn SmilesEncoder>) -> Self {
        DrugFeaturizer {
            fingerprinter: MorganFingerprinter::new(config),
            encoder,
        }
    }

    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema {
            fingerprint_bits: self.fingerprinter.len(),
            embedding_dim: self.encoder.dimension(),
        }
    }

    /// Computes the feature vector for one drug. The `id` only labels
    /// errors; features depend on the structure alone.
    pub fn featurize(&self, id: &DrugId, smiles: &str) -> Result<Vec<f32>> {
        let mol = parse_smiles(smiles).map_err(|e| PredictError::InvalidStructure {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

        let mut features = self.fingerprinter.fingerprint(&mol);
        let embedding = self.encoder.encode(smiles)?;
        if embedding.len() != self.encoder.dimension() {
            return Err(PredictError::DimensionMismatch {
                expected: self.encoder.dimension(),
                actual: embedding.len(),
            });
        }
        features.extend(embedding);

        debug!(drug = %id, width = features.len(), "featurized drug");
        Ok(features)
    }
}

/// Element-wise mean over equal-length vectors: the hyperedge embedding
/// of a drug set. The result does not depend on the input order.
pub fn mean_pool<V: AsRef<[f32]>>(vectors: &[V]) -> Result<Vec<f32>> {
    let Some(first) = vectors.first() else {
        return Err(PredictError::Config(
            "mean pooling requires at least one vector".to_string(),
        ));
    };
    let width = first.as_ref().len();
    let mut pooled = vec![0.0f32; width];
    for vector in vectors {
        let vector = vector.as_ref();
        if vector.len() != width {
            return Err(PredictError::DimensionMismatch {
                expected: width,
                actual: vector.len(),
            });
        }
        for (slot, value) in pooled.iter_mut().zip(vector.iter()) {
            *slot += value;
        }
    }
    let count = vectors.len() as f32;
    for slot in pooled.iter_mut() {
        *slot /= count;
    }
    Ok(pooled)
}
