//! API error type mapping pipeline failures to HTTP statuses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use polypharm_pipeline::PredictError;

/// Error returned by every API handler, rendered as `{ "error": "..." }`
/// with a matching status code. An empty report list is a normal 200
/// outcome, never an error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        match &e {
            PredictError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            PredictError::InvalidStructure { .. } => ApiError::Unprocessable(e.to_string()),
            PredictError::TooFewMembers { .. } => ApiError::BadRequest(e.to_string()),
            PredictError::DimensionMismatch { .. }
            | PredictError::Inference(_)
            | PredictError::Config(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_the_right_status() {
        let not_found = ApiError::from(PredictError::NotFound {
            what: "drug name",
            key: "x".to_string(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::from(PredictError::InvalidStructure {
            id: "DB1".to_string(),
            reason: "bad ring".to_string(),
        });
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let too_few = ApiError::from(PredictError::TooFewMembers { got: 1 });
        assert_eq!(too_few.status(), StatusCode::BAD_REQUEST);

        let broken = ApiError::from(PredictError::Inference("backend gone".to_string()));
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn messages_carry_the_offending_input() {
        let err = ApiError::from(PredictError::NotFound {
            what: "drug name",
            key: "unobtainium".to_string(),
        });
        assert!(err.to_string().contains("unobtainium"));
    }
}
