use axum::{routing::post, Json, Router};
use tracing::info;

use crate::{scoring, AppState, SensorReading, SoilHealthResult};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/soil-health", post(handler))
}

/// Score a single reading. The scorer is total, so this never fails once
/// the body has deserialized.
async fn handler(Json(reading): Json<SensorReading>) -> Json<SoilHealthResult> {
    // ---
    let result = scoring::score(&reading);
    info!(
        "POST /api/soil-health - score {} ({})",
        result.overall_score, result.category
    );
    Json(result)
}
