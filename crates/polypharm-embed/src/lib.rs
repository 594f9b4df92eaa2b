//! SMILES embeddings from a frozen chemical language model.
//!
//! Runs ChemBERTa (a RoBERTa encoder pretrained on ZINC SMILES strings)
//! through Candle, downloading weights from the Hugging Face Hub on first
//! use. No Python dependency.
//!
//! # Features
//! - 768-dim embeddings from seyonec/ChemBERTa-zinc-base-v1
//! - GPU support (CUDA, Metal) with automatic fallback to CPU
//! - Batched inference plus an LRU cache keyed by SMILES string
//! - Mean pooling over the last hidden state, matching how the
//!   interaction model's training features were produced
//!
//! # Example
//! ```no_run
//! use polypharm_embed::{ChemBertaEncoder, EmbedError, EncoderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EmbedError> {
//!     let encoder = ChemBertaEncoder::new(EncoderConfig::default()).await?;
//!
//!     let embedding = encoder.encode("CC(=O)Oc1ccccc1C(=O)O")?;
//!     println!("Embedding dimension: {}", embedding.len()); // 768
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod pooling;

pub use config::EncoderConfig;
pub use encoder::ChemBertaEncoder;
pub use error::{EmbedError, Result};
pub use pooling::PoolingStrategy;
