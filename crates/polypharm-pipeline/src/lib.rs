//! End-to-end interaction prediction for drug combinations.
//!
//! A combination is treated as one hyperedge: every member drug becomes a
//! feature vector (Morgan fingerprint concatenated with a ChemBERTa
//! embedding), the vectors are mean-pooled into a single hyperedge vector
//! and a gradient boosted ensemble turns that into an interaction
//! probability. Historical co-prescription reports are matched
//! independently of the model.
//!
//! The pipeline is synchronous; async callers wrap it in a blocking task.

pub mod encoder;
pub mod featurize;
pub mod predictor;
pub mod scorer;

pub use encoder::{MockSmilesEncoder, SmilesEncoder};
pub use featurize::{mean_pool, DrugFeaturizer, FeatureSchema};
pub use predictor::{InteractionCheck, InteractionPredictor, PairScore, Prediction};
pub use scorer::{InteractionScorer, Scored, DEFAULT_THRESHOLD};

use polypharm_embed::EmbedError;
use polypharm_gbdt::GbdtError;

pub type Result<T> = std::result::Result<T, PredictError>;

/// Failure modes of a prediction request.
///
/// `NotFound` and `InvalidStructure` describe the caller's input and are
/// raised before any model work for the offending drug; the rest indicate
/// a broken deployment (mismatched model artifacts, inference faults).
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("invalid structure for {id}: {reason}")]
    InvalidStructure { id: String, reason: String },

    #[error("feature vector has dimension {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model inference failed: {0}")]
    Inference(String),

    #[error("need at least two distinct drugs, got {got}")]
    TooFewMembers { got: usize },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<EmbedError> for PredictError {
    fn from(e: EmbedError) -> Self {
        PredictError::Inference(e.to_string())
    }
}

impl From<GbdtError> for PredictError {
    fn from(e: GbdtError) -> Self {
        match e {
            GbdtError::FeatureWidth { expected, actual } => {
                PredictError::DimensionMismatch { expected, actual }
            }
            other => PredictError::Inference(other.to_string()),
        }
    }
}
