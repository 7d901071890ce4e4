use std::convert::Infallible;

use amd_distributor_service::{
    error::DistributorError,
    store::StoreError,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use serde_derive::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::log::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Proof not found for user {0}")]
    ProofNotFound(String),

    #[error("No active distribution")]
    NoActiveDistribution,

    #[error("Invalid wallet address {0}")]
    InvalidWallet(String),

    #[error("Distributor Error")]
    DistributorError(#[from] DistributorError),

    #[error("Store Error")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Error {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::UserNotFound(w) => {
                error!("User {w} not found");
                (StatusCode::NOT_FOUND, "User not found".to_string())
            }
            ApiError::ProofNotFound(w) => {
                error!("Proof not found for user {w}");
                (StatusCode::NOT_FOUND, "Proof not found".to_string())
            }
            ApiError::NoActiveDistribution => {
                error!("No active distribution");
                (StatusCode::NOT_FOUND, "No active distribution".to_string())
            }
            ApiError::InvalidWallet(w) => {
                error!("Invalid wallet address: {w}");
                (StatusCode::BAD_REQUEST, "Invalid wallet address".to_string())
            }
            ApiError::DistributorError(DistributorError::GenerationInProgress) => (
                StatusCode::CONFLICT,
                "A distribution generation is already in progress".to_string(),
            ),
            ApiError::DistributorError(e) => {
                error!("Distributor error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    // Operators diagnosing a failed regenerate need the stage
                    // that failed, not a generic 500.
                    format!("Distribution generation failed: {e}"),
                )
            }
            ApiError::StoreError(e) => {
                error!("Store error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };
        (status, Json(Error { error: error_message })).into_response()
    }
}

pub async fn handle_error(error: BoxError) -> Result<impl IntoResponse, Infallible> {
    if error.is::<tower::timeout::error::Elapsed>() {
        return Ok((
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({
                "code" : 408,
                "error" : "Request Timeout",
            })),
        ));
    };
    if error.is::<tower::load_shed::error::Overloaded>() {
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "code" : 503,
                "error" : "Service Unavailable",
            })),
        ));
    }

    Ok((
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "code" : 500,
            "error" : "Internal Server Error",
        })),
    ))
}
