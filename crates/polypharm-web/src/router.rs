//! Axum router — maps URL paths to handlers.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{
    drugs::search_drugs, health::health, home::home, interactions::check_interactions,
};
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // UI
        .route("/", get(home))
        // API endpoints
        .route("/api/health", get(health))
        .route("/api/drugs", get(search_drugs))
        .route("/api/interactions/check", post(check_interactions))
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
