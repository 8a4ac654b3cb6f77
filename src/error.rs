//! Error type surfaced by the advisor API.
//!
//! Only caller mistakes and storage faults are errors here. An unreachable
//! ML backend is not: it switches the request onto the fallback selector.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Invalid input for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Recommendation history is not available: no database configured")]
    StorageUnavailable,

    #[error("Database operation failed: {0}")]
    Storage(#[from] sqlx::Error),
}

impl AdvisorError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AdvisorError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl IntoResponse for AdvisorError {
    fn into_response(self) -> Response {
        // ---
        let (status, body) = match &self {
            AdvisorError::Validation { field, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: self.to_string(),
                    message: "Please check your inputs and try again.".to_string(),
                    field: Some(field.clone()),
                },
            ),
            AdvisorError::StorageUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    error: self.to_string(),
                    message: "History is disabled on this deployment.".to_string(),
                    field: None,
                },
            ),
            AdvisorError::Storage(e) => {
                tracing::error!("Storage failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Database operation failed".to_string(),
                        message: "Something went wrong, please retry later.".to_string(),
                        field: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
