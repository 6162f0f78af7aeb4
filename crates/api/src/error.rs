//! API error types and HTTP status mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cashier_billing::BillingError;
use serde_json::json;
use thiserror::Error;

/// Errors returned by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream billing provider error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::AccountNotFound(_) | BillingError::SubscriptionNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            BillingError::InvalidInput(msg) => ApiError::Validation(msg),
            BillingError::CustomerMissing(_) => ApiError::Conflict(err.to_string()),
            BillingError::StripeApi(msg) => ApiError::Upstream(msg),
            BillingError::Database(msg) | BillingError::Config(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Upstream(msg) => {
                tracing::error!(error = %msg, "Billing provider call failed");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                // Never leak internals to the client
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
