//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::DomainError;
use notify::NotifyError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The request carries no usable identity.
    Unauthorized(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Internal server error. The detail is logged, not returned.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Validation(_) | DomainError::EmptyCart => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::PermissionDenied(_) => (StatusCode::FORBIDDEN, err.to_string()),
        DomainError::StockConflict { .. }
        | DomainError::InvalidTransition { .. }
        | DomainError::TierLimitReached { .. } => (StatusCode::CONFLICT, err.to_string()),
        DomainError::Store(inner) => {
            tracing::error!(error = %inner, "store error behind domain operation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Domain(inner) => ApiError::Domain(inner),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        // Route through the domain mapping so NotFound and friends keep
        // their status codes.
        ApiError::Domain(DomainError::from(err))
    }
}

impl From<NotifyError> for ApiError {
    fn from(err: NotifyError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
