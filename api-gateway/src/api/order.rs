//! Order API handlers
//!
//! Handlers for the order lifecycle endpoints:
//! - Create an order (checkout)
//! - Payment breakdown for display and receipts
//! - Delivery transitions (mark delivering, dual confirmation)
//! - Cancellation
//! - Incoming/outgoing order views

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use common::model::order::{Order, Role};
use common::model::payment::PaymentBreakdown;
use order_service::OrderView;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::response::{ApiListResponse, ApiResponse};
use crate::api::acting_user;
use crate::error::ApiError;
use crate::AppState;

/// Create order request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Listing being purchased
    pub listing_id: Uuid,
    /// Units to purchase
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Create a new order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created"),
        (status = 400, description = "Insufficient stock, self purchase, or listing not sellable"),
        (status = 404, description = "Listing not found")
    ),
    tag = "order"
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Result<ApiResponse<Order>, ApiError> {
    let buyer_id = acting_user(&headers)?;

    let order = state.order_service
        .create_order(buyer_id, request.listing_id, request.quantity)
        .await
        .map_err(ApiError::Common)?;

    Ok(ApiResponse::new(order))
}

/// Get an order by ID
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found"),
        (status = 404, description = "Order not found")
    ),
    tag = "order"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Order>, ApiError> {
    let order = state.order_service.get_order(id).await.map_err(ApiError::Common)?;
    Ok(ApiResponse::new(order))
}

/// Get the payment breakdown for an order
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/payment-breakdown",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Payment breakdown"),
        (status = 404, description = "Order not found")
    ),
    tag = "order"
)]
pub async fn get_payment_breakdown(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<PaymentBreakdown>, ApiError> {
    let breakdown = state.order_service
        .get_payment_breakdown(id)
        .await
        .map_err(ApiError::Common)?;
    Ok(ApiResponse::new(breakdown))
}

/// Seller marks the order as out for delivery
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/mark-delivering",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order is delivering"),
        (status = 403, description = "Not permitted"),
        (status = 409, description = "Order is terminal")
    ),
    tag = "order"
)]
pub async fn mark_delivering(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<ApiResponse<Order>, ApiError> {
    let acting_user_id = acting_user(&headers)?;

    let order = state.order_service
        .mark_delivering(id, acting_user_id)
        .await
        .map_err(ApiError::Common)?;
    Ok(ApiResponse::new(order))
}

/// Seller confirms delivery
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/confirm-delivery-seller",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Confirmation recorded"),
        (status = 403, description = "Not permitted"),
        (status = 409, description = "Order is terminal or not delivering")
    ),
    tag = "order"
)]
pub async fn confirm_delivery_seller(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<ApiResponse<Order>, ApiError> {
    let acting_user_id = acting_user(&headers)?;

    let order = state.order_service
        .confirm_delivery_seller(id, acting_user_id)
        .await
        .map_err(ApiError::Common)?;
    Ok(ApiResponse::new(order))
}

/// Buyer confirms delivery
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/confirm-delivery-buyer",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Confirmation recorded"),
        (status = 403, description = "Not permitted"),
        (status = 409, description = "Order is terminal or not delivering")
    ),
    tag = "order"
)]
pub async fn confirm_delivery_buyer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<ApiResponse<Order>, ApiError> {
    let acting_user_id = acting_user(&headers)?;

    let order = state.order_service
        .confirm_delivery_buyer(id, acting_user_id)
        .await
        .map_err(ApiError::Common)?;
    Ok(ApiResponse::new(order))
}

/// Cancel an order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled"),
        (status = 403, description = "Not permitted"),
        (status = 409, description = "Order is terminal")
    ),
    tag = "order"
)]
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<ApiResponse<Order>, ApiError> {
    let acting_user_id = acting_user(&headers)?;

    let order = state.order_service
        .cancel_order(id, acting_user_id)
        .await
        .map_err(ApiError::Common)?;
    Ok(ApiResponse::new(order))
}

/// Orders where the user is the seller
#[utoipa::path(
    get,
    path = "/api/v1/orders/incoming/{user_id}",
    params(("user_id" = Uuid, Path, description = "Seller user ID")),
    responses((status = 200, description = "Incoming orders")),
    tag = "order"
)]
pub async fn incoming_orders(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<ApiListResponse<OrderView>, ApiError> {
    let views = state.order_service
        .list_orders_for_user(user_id, Role::Seller)
        .await
        .map_err(ApiError::Common)?;
    Ok(ApiListResponse::new(views))
}

/// Orders where the user is the buyer
#[utoipa::path(
    get,
    path = "/api/v1/orders/outgoing/{user_id}",
    params(("user_id" = Uuid, Path, description = "Buyer user ID")),
    responses((status = 200, description = "Outgoing orders")),
    tag = "order"
)]
pub async fn outgoing_orders(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<ApiListResponse<OrderView>, ApiError> {
    let views = state.order_service
        .list_orders_for_user(user_id, Role::Buyer)
        .await
        .map_err(ApiError::Common)?;
    Ok(ApiListResponse::new(views))
}
