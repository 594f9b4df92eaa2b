//! Inference-only reader for gradient boosted decision tree ensembles in
//! the LightGBM text model format.
//!
//! Loads the `.booster`/`.txt` files LightGBM writes with `save_model`,
//! walks every tree for a feature vector and applies the objective's link
//! function. Training, categorical splits and multiclass models are out of
//! scope; the reader rejects what it cannot evaluate at load time rather
//! than mis-scoring at prediction time.

mod booster;

pub use booster::Booster;

pub type Result<T> = std::result::Result<T, GbdtError>;

#[derive(Debug, thiserror::Error)]
pub enum GbdtError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("model is missing required field '{field}'")]
    MissingField { field: String },

    #[error("field '{field}' holds unparseable value '{value}'")]
    InvalidValue { field: String, value: String },

    #[error("unsupported model feature: {0}")]
    Unsupported(String),

    #[error("malformed model: {0}")]
    Malformed(String),

    #[error("feature vector has width {actual} but the model expects {expected}")]
    FeatureWidth { expected: usize, actual: usize },
}
