//! Drug name search backing the UI's picker.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct DrugQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct DrugHit {
    pub name: String,
    pub drugbank_id: String,
}

#[derive(Debug, Serialize)]
pub struct DrugSearchResponse {
    pub query: String,
    pub results: Vec<DrugHit>,
}

/// GET /api/drugs?q=aspi&limit=10 — substring search over catalog names
pub async fn search_drugs(
    State(state): State<SharedState>,
    Query(query): Query<DrugQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(20).min(100);
    let results = state
        .predictor
        .catalog()
        .search(&query.q, limit)
        .into_iter()
        .map(|(name, id)| DrugHit {
            name,
            drugbank_id: id.to_string(),
        })
        .collect();
    Json(DrugSearchResponse {
        query: query.q,
        results,
    })
}
