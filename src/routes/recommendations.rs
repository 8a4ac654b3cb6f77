use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::fallback::CropInput;
use crate::ml_client::{predict_or_fallback, PredictionFeatures};
use crate::models::{require_number, FormValue, PredictionSource, ReadingForm};
use crate::recommend::{self, AreaUnit, Farm, Recommendation};
use crate::{AdvisorError, AppState};

// ---

const DEFAULT_HISTORY_LIMIT: u32 = 20;
const MAX_HISTORY_LIMIT: u32 = 100;

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/recommendations", post(create).get(history))
}

/// Body posted by the recommendation form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    farm_id: Option<String>,
    crop_type: CropInput,
    field_size: Option<FormValue>,
    #[serde(default)]
    field_unit: AreaUnit,
    reading: ReadingForm,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationResponse {
    id: Uuid,
    farm_id: Option<String>,
    created_at: DateTime<Utc>,
    source: PredictionSource,
    #[serde(flatten)]
    recommendation: Recommendation,
}

async fn create(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AdvisorError> {
    // ---
    info!("POST /api/recommendations - Starting");

    // Step 1: Validate form input
    debug!("POST /api/recommendations - Step 1");

    let (crop, crop_label) = request.crop_type.resolve();
    let farm = Farm {
        farm_id: request.farm_id,
        crop: crop_label,
        field_size: require_number("fieldSize", request.field_size.as_ref())?,
        field_unit: request.field_unit,
    };
    let reading = request.reading.to_reading()?;

    // Step 2: Primary fertilizer from the model, or the fallback selector
    debug!("POST /api/recommendations - Step 2");

    let features = PredictionFeatures::new(&farm.crop, crop, &reading);
    let (choice, source) =
        predict_or_fallback(state.ml.as_ref(), crop, &features, &state.config.constants).await;

    // Step 3: Compose
    debug!("POST /api/recommendations - Step 3");

    let recommendation = recommend::compose(&farm, &reading, &choice, &state.config.constants)?;

    let response = RecommendationResponse {
        id: Uuid::new_v4(),
        farm_id: farm.farm_id,
        created_at: Utc::now(),
        source,
        recommendation,
    };

    // Step 4: Persist when history is enabled
    if let Some(pool) = &state.pool {
        debug!("POST /api/recommendations - Step 4");
        if let Err(e) = store_recommendation(pool, &response).await {
            error!("Failed to store recommendation {}: {}", response.id, e);
        }
    }

    info!(
        "Recommendation {} complete: {} via {:?}",
        response.id, response.recommendation.primary_fertilizer.name, response.source
    );
    Ok(Json(response))
}

async fn store_recommendation(
    pool: &PgPool,
    response: &RecommendationResponse,
) -> Result<(), sqlx::Error> {
    // ---
    let rec = &response.recommendation;
    let source = match response.source {
        PredictionSource::Model => "model",
        PredictionSource::Fallback => "fallback",
    };

    sqlx::query(
        r#"
        INSERT INTO recommendations (
            id, farm_id, created_at, crop, fertilizer, confidence,
            source, soil_score, soil_category, total_cost, payload
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(response.id)
    .bind(&response.farm_id)
    .bind(response.created_at)
    .bind(&rec.crop)
    .bind(&rec.primary_fertilizer.name)
    .bind(rec.primary_fertilizer.confidence.unwrap_or_default())
    .bind(source)
    .bind(i16::from(rec.soil_health.overall_score))
    .bind(rec.soil_health.category.to_string())
    .bind(rec.cost_estimate.total)
    .bind(sqlx::types::Json(response))
    .execute(pool)
    .await?;

    Ok(())
}

/// Query parameters for the history listing
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    farm_id: Option<String>,
    limit: Option<u32>,
}

/// One stored recommendation, as listed by `GET /api/recommendations`.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecommendation {
    // ---
    pub id: Uuid,
    pub farm_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub crop: String,
    pub fertilizer: String,
    pub confidence: f64,
    pub source: String,
    pub soil_score: i16,
    pub soil_category: String,
    pub total_cost: i64,
    pub payload: serde_json::Value,
}

async fn history(
    Query(params): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredRecommendation>>, AdvisorError> {
    // ---
    info!("GET /api/recommendations - {:?}", params);

    let pool = state.pool.as_ref().ok_or(AdvisorError::StorageUnavailable)?;
    let limit = history_limit(params.limit);

    let rows = sqlx::query_as::<_, StoredRecommendation>(
        r#"
        SELECT id, farm_id, created_at, crop, fertilizer, confidence,
               source, soil_score, soil_category, total_cost, payload
        FROM recommendations
        WHERE ($1::TEXT IS NULL OR farm_id = $1)
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(&params.farm_id)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    debug!("GET /api/recommendations - Returning {} rows", rows.len());
    Ok(Json(rows))
}

fn history_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_history_limit_bounds() {
        assert_eq!(history_limit(None), 20);
        assert_eq!(history_limit(Some(0)), 1);
        assert_eq!(history_limit(Some(55)), 55);
        assert_eq!(history_limit(Some(5_000)), 100);
    }

    #[test]
    fn test_request_accepts_form_strings() {
        // ---
        let body = r#"{
            "farmId": "farm-12",
            "cropType": "wheat",
            "fieldSize": "5.5",
            "fieldUnit": "acres",
            "reading": {
                "nitrogen": "40", "phosphorus": 10, "potassium": 50, "pH": "6.4",
                "soilMoisture": 45, "soilTemperature": 22, "ambientTemperature": 27,
                "humidity": 60
            }
        }"#;
        let request: RecommendationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.field_unit, AreaUnit::Acres);
        assert_eq!(require_number("fieldSize", request.field_size.as_ref()).unwrap(), 5.5);
        assert_eq!(request.reading.to_reading().unwrap().nitrogen, 40.0);
    }

    #[test]
    fn test_request_unit_defaults_to_acres() {
        // ---
        let body = r#"{ "cropType": 3, "fieldSize": 2, "reading": {} }"#;
        let request: RecommendationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.field_unit, AreaUnit::Acres);
        assert!(request.reading.to_reading().is_err());
    }
}
