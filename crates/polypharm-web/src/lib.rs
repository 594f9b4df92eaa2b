//! polypharm-web — HTTP surface for the interaction predictor
//! Provides:
//!   - Drug name search for autocomplete
//!   - Combination interaction checks
//!   - A minimal single-page UI
//!   - Health endpoint with table and model cardinalities

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
