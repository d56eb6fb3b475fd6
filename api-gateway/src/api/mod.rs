//! API handlers
//!
//! This module contains all the API endpoint handlers organized by resource.
//! Each handler follows a consistent pattern:
//! - Extract state and parameters using Axum extractors
//! - Resolve the acting user from the upstream auth layer's header
//! - Call the appropriate service methods
//! - Map the result to a standardized response format

pub mod listing;
pub mod order;
pub mod response;

// Re-export the response module for easy access
pub use response::{ApiResponse, ApiListResponse};

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the verified acting user id, set by the upstream
/// authentication layer. This core performs identity-based authorization
/// only; credential checks happen before the request reaches it.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the acting user from the request headers
pub(crate) fn acting_user(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", USER_ID_HEADER)))?;

    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized(format!("Invalid {} header", USER_ID_HEADER)))?;

    Uuid::parse_str(value)
        .map_err(|_| ApiError::Unauthorized(format!("Invalid {} header", USER_ID_HEADER)))
}
