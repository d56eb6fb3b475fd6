//! Error handling for the API gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error information
    pub error: ErrorInfo,
    /// Request ID for tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Detailed error information
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code (string identifier for the error type)
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API errors
#[derive(Debug, thiserror::Error)]
#[allow(dead_code)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Common error: {0}")]
    Common(#[from] common::error::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Generate a request ID for tracking errors
        let request_id = Uuid::new_v4().to_string();

        // Log the error with request ID for backend tracing
        tracing::error!("API Error [{}]: {:?}", request_id, &self);

        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Common(e) => match e {
                // Validation errors: caller-correctable (4xx)
                common::error::Error::InsufficientStock(_) => (StatusCode::BAD_REQUEST, "insufficient_stock"),
                common::error::Error::SelfPurchase(_) => (StatusCode::BAD_REQUEST, "self_purchase"),
                common::error::Error::ListingNotSellable(_) => (StatusCode::BAD_REQUEST, "listing_not_sellable"),
                common::error::Error::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),

                // Authorization errors: a caller acting outside its role
                common::error::Error::NotBuyer(_)
                | common::error::Error::NotSeller(_)
                | common::error::Error::NotParty(_) => (StatusCode::FORBIDDEN, "not_permitted"),

                // State errors: stale client view
                common::error::Error::TerminalOrder(_) => (StatusCode::CONFLICT, "terminal_order"),
                common::error::Error::InvalidTransition(_) => (StatusCode::CONFLICT, "invalid_transition"),
                common::error::Error::ListingNotDeletable(_) => (StatusCode::CONFLICT, "listing_not_deletable"),

                // Not-found errors
                common::error::Error::OrderNotFound(_) => (StatusCode::NOT_FOUND, "order_not_found"),
                common::error::Error::ListingNotFound(_) => (StatusCode::NOT_FOUND, "listing_not_found"),
                common::error::Error::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),

                // Everything else is a server-side failure
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
        };

        // Authorization failures get a generic message: the body must not
        // leak which party would have been permitted.
        let message = if status == StatusCode::FORBIDDEN {
            "You are not permitted to perform this action".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorInfo {
                code: code.to_string(),
                message,
                details: None,
            },
            request_id: Some(request_id),
        };

        (status, Json(body)).into_response()
    }
}
