//! Client for the external fertilizer prediction backend.
//!
//! The backend takes crop and soil features and answers with
//! `{ "fertilizer": string, "confidence": number }`. Each attempt is bounded
//! by the configured timeout and a failed attempt is retried once. When the
//! backend still fails, [`predict_or_fallback`] hands over to the rule-based
//! selector; the network error is logged and goes no further.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AdvisorConstants;
use crate::fallback::{self, CropType, Npk};
use crate::models::{FertilizerChoice, PredictionSource, SensorReading};

// ---

const MAX_RETRIES: u32 = 1;

/// Feature vector posted to `/predict`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionFeatures {
    // ---
    pub crop_type: String,
    pub crop_type_id: Option<i64>,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub moisture: f64,
    pub temperature: f64,
    pub humidity: f64,
}

impl PredictionFeatures {
    pub fn new(crop_label: &str, crop: Option<CropType>, reading: &SensorReading) -> Self {
        // ---
        Self {
            crop_type: crop_label.to_string(),
            crop_type_id: crop.map(CropType::id),
            nitrogen: reading.nitrogen,
            phosphorus: reading.phosphorus,
            potassium: reading.potassium,
            ph: reading.ph,
            moisture: reading.soil_moisture,
            temperature: reading.ambient_temperature,
            humidity: reading.humidity,
        }
    }

    fn npk(&self) -> Npk {
        Npk {
            nitrogen: self.nitrogen,
            phosphorus: self.phosphorus,
            potassium: self.potassium,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MlClient {
    client: reqwest::Client,
    predict_url: String,
}

impl MlClient {
    /// Build a client for `base_url` with a per-attempt `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        // ---
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build ML backend HTTP client")?;

        Ok(Self {
            client,
            predict_url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }

    /// Ask the backend for a prediction, retrying once on failure.
    pub async fn predict(&self, features: &PredictionFeatures) -> Result<FertilizerChoice> {
        // ---
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request_once(features).await {
                Ok(choice) => return Ok(choice),
                Err(e) if attempt <= MAX_RETRIES => {
                    warn!("ML backend attempt {} failed, retrying: {:#}", attempt, e);
                }
                Err(e) => {
                    return Err(e.context(format!("ML backend failed after {} attempts", attempt)))
                }
            }
        }
    }

    async fn request_once(&self, features: &PredictionFeatures) -> Result<FertilizerChoice> {
        // ---
        debug!("POST {} with {:?}", self.predict_url, features);

        let choice: FertilizerChoice = self
            .client
            .post(&self.predict_url)
            .json(features)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if choice.fertilizer.trim().is_empty() {
            return Err(anyhow!("ML backend returned an empty fertilizer name"));
        }
        if !choice.confidence.is_finite() {
            return Err(anyhow!("ML backend returned a non-finite confidence"));
        }
        Ok(choice)
    }
}

/// Model prediction when available, rule-based selection otherwise.
pub async fn predict_or_fallback(
    ml: Option<&MlClient>,
    crop: Option<CropType>,
    features: &PredictionFeatures,
    constants: &AdvisorConstants,
) -> (FertilizerChoice, PredictionSource) {
    // ---
    if let Some(ml) = ml {
        match ml.predict(features).await {
            Ok(choice) => {
                info!(
                    "ML backend recommended {} ({:.1}%)",
                    choice.fertilizer, choice.confidence
                );
                return (choice, PredictionSource::Model);
            }
            Err(e) => {
                warn!("ML backend unavailable, using fallback selector: {:#}", e);
            }
        }
    } else {
        debug!("No ML backend configured, using fallback selector");
    }

    let choice = fallback::select_for_crop(crop, &features.npk(), constants.fallback_confidence);
    (choice, PredictionSource::Fallback)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn wheat_features() -> PredictionFeatures {
        // ---
        let reading = SensorReading {
            nitrogen: 40.0,
            phosphorus: 10.0,
            potassium: 50.0,
            ph: 6.5,
            soil_moisture: 45.0,
            soil_temperature: 22.0,
            ambient_temperature: 26.0,
            humidity: 55.0,
            electrical_conductivity: 0.0,
        };
        PredictionFeatures::new("Wheat", Some(CropType::Wheat), &reading)
    }

    #[test]
    fn test_no_backend_uses_fallback() {
        // ---
        let (choice, source) = tokio_test::block_on(predict_or_fallback(
            None,
            Some(CropType::Wheat),
            &wheat_features(),
            &AdvisorConstants::default(),
        ));

        assert_eq!(source, PredictionSource::Fallback);
        assert_eq!(choice.fertilizer, "DAP");
        assert_eq!(choice.confidence, 92.0);
    }

    #[test]
    fn test_unreachable_backend_falls_back() {
        // ---
        let client = MlClient::new("http://127.0.0.1:9/", Duration::from_millis(300)).unwrap();
        assert_eq!(client.predict_url, "http://127.0.0.1:9/predict");

        let (choice, source) = tokio_test::block_on(predict_or_fallback(
            Some(&client),
            Some(CropType::Wheat),
            &wheat_features(),
            &AdvisorConstants::default(),
        ));

        assert_eq!(source, PredictionSource::Fallback);
        assert_eq!(choice.fertilizer, "DAP");
    }

    #[tokio::test]
    async fn test_failed_attempt_is_retried_exactly_once() {
        // ---
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        // accepts and immediately hangs up, so every attempt fails
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        });

        let client = MlClient::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        let result = client.predict(&wheat_features()).await;

        assert!(result.is_err());
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_features_json_shape() {
        // ---
        let json = serde_json::to_value(wheat_features()).unwrap();
        assert_eq!(json["cropType"], "Wheat");
        assert_eq!(json["cropTypeId"], 1);
        assert_eq!(json["pH"], 6.5);
        assert_eq!(json["moisture"], 45.0);
    }
}
