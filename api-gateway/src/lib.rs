// api-gateway/src/lib.rs
pub mod api;
pub mod config;
pub mod error;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use listing_service::ListingService;
use order_service::OrderService;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::listing::{create_listing, delete_listing, get_listing, update_listing};
use crate::api::order::{
    cancel_order, confirm_delivery_buyer, confirm_delivery_seller, create_order,
    get_order, get_payment_breakdown, incoming_orders, mark_delivering, outgoing_orders,
};

/// App state shared across handlers
pub struct AppState {
    /// Listing directory and inventory ledger
    pub listing_service: Arc<ListingService>,
    /// Order lifecycle service
    pub order_service: Arc<OrderService>,
}

/// API documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Listing routes
        api::listing::create_listing,
        api::listing::get_listing,
        api::listing::update_listing,
        api::listing::delete_listing,
        // Order routes
        api::order::create_order,
        api::order::get_order,
        api::order::get_payment_breakdown,
        api::order::mark_delivering,
        api::order::confirm_delivery_seller,
        api::order::confirm_delivery_buyer,
        api::order::cancel_order,
        api::order::incoming_orders,
        api::order::outgoing_orders,
    ),
    components(
        schemas(
            // Listing API
            api::listing::CreateListingRequest,
            api::listing::UpdateListingRequest,
            common::model::listing::Listing,

            // Order API
            api::order::CreateOrderRequest,
            common::model::order::Order,
            common::model::order::Status,
            common::model::payment::PaymentBreakdown,
            order_service::OrderView,

            // Response models
            api::response::ApiResponse<common::model::order::Order>,
            api::response::ApiResponse<common::model::listing::Listing>,
            api::response::ApiResponse<common::model::payment::PaymentBreakdown>,
            api::response::ApiListResponse<order_service::OrderView>,
            api::response::ResponseMetadata
        )
    ),
    tags(
        (name = "listing", description = "Listing management endpoints"),
        (name = "order", description = "Order lifecycle endpoints")
    ),
    info(
        title = "BookMart Marketplace API",
        version = "1.0.0",
        description = "API for the book marketplace covering listings, orders, payment breakdowns, and the dual-confirmation delivery flow"
    )
)]
pub struct ApiDoc;

/// Build the application router with all API routes, the Swagger UI, and
/// the shared service state.
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Listing routes
        .route("/listings", post(create_listing))
        .route("/listings/:id", get(get_listing))
        .route("/listings/:id", put(update_listing))
        .route("/listings/:id", delete(delete_listing))

        // Order routes
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/payment-breakdown", get(get_payment_breakdown))
        .route("/orders/:id/mark-delivering", post(mark_delivering))
        .route("/orders/:id/confirm-delivery-seller", post(confirm_delivery_seller))
        .route("/orders/:id/confirm-delivery-buyer", post(confirm_delivery_buyer))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/incoming/:user_id", get(incoming_orders))
        .route("/orders/outgoing/:user_id", get(outgoing_orders));

    let swagger_ui = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi());

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(swagger_ui)
        .with_state(state)
}
