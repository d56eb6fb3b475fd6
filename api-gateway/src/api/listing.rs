//! Listing API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use common::model::listing::Listing;
use listing_service::{ListingUpdate, NewListing};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::acting_user;
use crate::api::response::ApiResponse;
use crate::error::ApiError;
use crate::AppState;

/// Create listing request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateListingRequest {
    /// Book title
    pub title: String,
    /// Book author
    #[serde(default)]
    pub author: String,
    /// Unit price
    pub price: Decimal,
    /// Units offered
    pub quantity: u32,
    /// Whether the listing can be purchased
    #[serde(default = "default_true")]
    pub is_sellable: bool,
    /// Whether the listing can be swapped
    #[serde(default)]
    pub is_swappable: bool,
    /// Book condition (e.g. "Like New")
    #[serde(default)]
    pub condition: String,
    /// Seller's city
    #[serde(default)]
    pub city: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Update listing request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateListingRequest {
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_sellable: bool,
    #[serde(default)]
    pub is_swappable: bool,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub city: Option<String>,
}

/// Create a new listing
#[utoipa::path(
    post,
    path = "/api/v1/listings",
    request_body = CreateListingRequest,
    responses(
        (status = 200, description = "Listing created"),
        (status = 400, description = "Invalid listing fields")
    ),
    tag = "listing"
)]
pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateListingRequest>,
) -> Result<ApiResponse<Listing>, ApiError> {
    let owner_id = acting_user(&headers)?;

    let listing = state.listing_service
        .create_listing(owner_id, NewListing {
            title: request.title,
            author: request.author,
            price: request.price,
            quantity: request.quantity,
            is_sellable: request.is_sellable,
            is_swappable: request.is_swappable,
            condition: request.condition,
            city: request.city,
        })
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(listing))
}

/// Get a listing by ID
#[utoipa::path(
    get,
    path = "/api/v1/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing found"),
        (status = 404, description = "Listing not found")
    ),
    tag = "listing"
)]
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Listing>, ApiError> {
    let listing = state.listing_service
        .get_listing(id)
        .await
        .map_err(ApiError::Common)?
        .ok_or_else(|| ApiError::NotFound(format!("Listing not found: {}", id)))?;

    Ok(ApiResponse::new(listing))
}

/// Update a listing's owner-editable fields
#[utoipa::path(
    put,
    path = "/api/v1/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Listing updated"),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Listing not found")
    ),
    tag = "listing"
)]
pub async fn update_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<UpdateListingRequest>,
) -> Result<ApiResponse<Listing>, ApiError> {
    let acting_user_id = acting_user(&headers)?;

    let listing = state.listing_service
        .update_listing(acting_user_id, id, ListingUpdate {
            title: request.title,
            author: request.author,
            price: request.price,
            is_sellable: request.is_sellable,
            is_swappable: request.is_swappable,
            condition: request.condition,
            city: request.city,
        })
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(listing))
}

/// Delete a listing
#[utoipa::path(
    delete,
    path = "/api/v1/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing deleted"),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Listing not found"),
        (status = 409, description = "Listing has sold or reserved units")
    ),
    tag = "listing"
)]
pub async fn delete_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let acting_user_id = acting_user(&headers)?;

    state.listing_service
        .delete_listing(acting_user_id, id)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(serde_json::json!({ "deleted": id })))
}
