use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use stockroom_core::DomainError;
use stockroom_infra::{GatewayError, StoreError};
use stockroom_inventory::StockError;

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Domain(e) => ApiError::Domain(e),
            GatewayError::Store(e) => ApiError::Store(e),
        }
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Domain(DomainError::Validation(msg)) => {
                json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
            }
            ApiError::Domain(DomainError::InvalidId(msg)) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
            ApiError::Domain(e @ DomainError::NotFound(_)) => {
                json_error(StatusCode::NOT_FOUND, "not_found", e.to_string())
            }
            ApiError::Domain(DomainError::Conflict(msg)) => json_error(StatusCode::BAD_REQUEST, "conflict", msg),
            ApiError::Store(e @ StoreError::DuplicateKey { .. }) => {
                json_error(StatusCode::BAD_REQUEST, "conflict", e.to_string())
            }
            ApiError::Store(e @ StoreError::Stale { .. }) => {
                json_error(StatusCode::CONFLICT, "stale_revision", e.to_string())
            }
            ApiError::Store(e) => {
                tracing::error!(error = %e, "storage failure");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal Server Error")
            }
            ApiError::MalformedBody(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_json", msg),
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
