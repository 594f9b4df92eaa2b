//! Liveness endpoint reporting what the server has loaded.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub drugs: usize,
    pub structures: usize,
    pub reports: usize,
    pub schema: String,
    pub threshold: f64,
}

/// GET /api/health — status plus table and model cardinalities
pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        drugs: state.predictor.catalog().len(),
        structures: state.predictor.structure_count(),
        reports: state.predictor.report_count(),
        schema: state.predictor.schema().version(),
        threshold: state.predictor.threshold(),
    })
}
