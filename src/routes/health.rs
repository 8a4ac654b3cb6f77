// src/routes/health.rs
//! API health check endpoint for the advisor service.
//!
//! Used by container orchestrators and CI pipelines to verify that the
//! service is running. Also reports which optional collaborators are wired,
//! so an operator can tell at a glance whether predictions will come from
//! the ML backend or the fallback selector.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    ml_backend: bool,
    history: bool,
}

/// Handle `GET /health`.
///
/// Does not call the ML backend or the database.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ml_backend: state.ml.is_some(),
        history: state.pool.is_some(),
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
