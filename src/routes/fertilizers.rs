use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fallback::{CropInput, Fertilizer, FertilizerInfo};
use crate::ml_client::{predict_or_fallback, PredictionFeatures};
use crate::models::{PredictionSource, ReadingForm};
use crate::{AdvisorError, AppState};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/fertilizers", get(catalog))
        .route("/api/fertilizer/predict", post(predict))
}

async fn catalog() -> Json<Vec<FertilizerInfo>> {
    Json(Fertilizer::CATALOG.iter().map(|f| f.info()).collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    crop_type: CropInput,
    #[serde(flatten)]
    reading: ReadingForm,
}

/// Same shape as the ML backend answer, tagged with where it came from.
#[derive(Debug, Serialize)]
struct PredictResponse {
    fertilizer: String,
    confidence: f64,
    source: PredictionSource,
}

async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, AdvisorError> {
    // ---
    let reading = request.reading.to_reading()?;
    let (crop, crop_label) = request.crop_type.resolve();
    info!("POST /api/fertilizer/predict - crop {}", crop_label);

    let features = PredictionFeatures::new(&crop_label, crop, &reading);
    let (choice, source) =
        predict_or_fallback(state.ml.as_ref(), crop, &features, &state.config.constants).await;

    Ok(Json(PredictResponse {
        fertilizer: choice.fertilizer,
        confidence: choice.confidence,
        source,
    }))
}
