//! Combination interaction checks — the main API endpoint.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use polypharm_pipeline::{InteractionCheck, PairScore, Prediction};
use polypharm_store::InteractionReport;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub names: Vec<String>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub drugs: Vec<String>,
    pub prediction: Prediction,
    pub pairwise: Vec<PairScore>,
    pub known_reports: Vec<InteractionReport>,
    pub checked_at: String,
}

/// POST /api/interactions/check — score a drug combination
pub async fn check_interactions(
    State(state): State<SharedState>,
    Json(request): Json<CheckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&request, state.config.server.max_group_size)?;

    let predictor = Arc::clone(&state.predictor);
    let CheckRequest { names, threshold } = request;
    // The pipeline is synchronous CPU work; keep it off the async runtime.
    let outcome = tokio::task::spawn_blocking(move || predictor.check(&names, threshold))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(to_response(outcome)))
}

fn validate(request: &CheckRequest, max_group_size: usize) -> Result<(), ApiError> {
    if request.names.len() < 2 {
        return Err(ApiError::BadRequest(format!(
            "need at least 2 drug names, got {}",
            request.names.len()
        )));
    }
    if request.names.len() > max_group_size {
        return Err(ApiError::BadRequest(format!(
            "at most {} drugs per check, got {}",
            max_group_size,
            request.names.len()
        )));
    }
    if let Some(threshold) = request.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ApiError::BadRequest(format!(
                "threshold must be within [0, 1], got {threshold}"
            )));
        }
    }
    Ok(())
}

fn to_response(outcome: InteractionCheck) -> CheckResponse {
    CheckResponse {
        drugs: outcome
            .prediction
            .members
            .iter()
            .map(|id| id.to_string())
            .collect(),
        prediction: outcome.prediction,
        pairwise: outcome.pairwise,
        known_reports: outcome.known_reports,
        checked_at: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn request(names: &[&str], threshold: Option<f64>) -> CheckRequest {
        CheckRequest {
            names: names.iter().map(|s| s.to_string()).collect(),
            threshold,
        }
    }

    #[test]
    fn accepts_well_formed_requests() {
        assert!(validate(&request(&["a", "b"], None), 20).is_ok());
        assert!(validate(&request(&["a", "b", "c"], Some(0.9)), 20).is_ok());
        assert!(validate(&request(&["a", "b"], Some(0.0)), 20).is_ok());
        assert!(validate(&request(&["a", "b"], Some(1.0)), 20).is_ok());
    }

    #[test]
    fn rejects_too_few_names() {
        let err = validate(&request(&["a"], None), 20).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rejects_oversized_groups() {
        let names: Vec<String> = (0..21).map(|i| format!("drug{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let err = validate(&request(&refs, None), 20).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("at most 20"));
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        assert!(validate(&request(&["a", "b"], Some(1.5)), 20).is_err());
        assert!(validate(&request(&["a", "b"], Some(-0.1)), 20).is_err());
    }
}
