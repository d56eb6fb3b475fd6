// File: tests/integration_tests.rs
//
// End-to-end tests over the full HTTP surface: the real router wired to
// in-memory services, driven through the same requests a client would send.


use axum::http::{Method, StatusCode};
use serde_json::json;
use test_helpers::{spawn_app, TestApp};
use uuid::Uuid;

async fn create_listing(app: &TestApp, owner: Uuid, title: &str, price: &str, quantity: u32) -> Uuid {
    let (status, body) = app.post("/api/v1/listings", owner, json!({
        "title": title,
        "author": "Test Author",
        "price": price,
        "quantity": quantity,
        "condition": "Good"
    })).await;
    assert_eq!(status, StatusCode::OK, "create listing failed: {}", body);
    Uuid::parse_str(body["data"]["id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn create_and_fetch_listing() {
    let app = spawn_app();
    let john = app.register_user("john", "John Doe");

    let listing_id = create_listing(&app, john, "The Great Gatsby", "12.99", 3).await;

    let (status, body) = app.get(&format!("/api/v1/listings/{}", listing_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "The Great Gatsby");
    assert_eq!(body["data"]["price"], "12.99");
    assert_eq!(body["data"]["quantity"], 3);
    assert_eq!(body["data"]["available_quantity"], 3);
    assert_eq!(body["data"]["owner_id"], john.to_string());
}

#[tokio::test]
async fn request_without_user_header_is_unauthorized() {
    let app = spawn_app();

    let (status, body) = app.request(
        Method::POST,
        "/api/v1/orders",
        None,
        Some(json!({ "listing_id": Uuid::new_v4(), "quantity": 1 })),
    ).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn checkout_reports_payment_breakdown() {
    let app = spawn_app();
    let john = app.register_user("john", "John Doe");
    let alice = app.register_user("alice", "Alice Smith");
    let listing_id = create_listing(&app, john, "The Great Gatsby", "12.99", 3).await;

    let (status, body) = app.post("/api/v1/orders", alice, json!({
        "listing_id": listing_id,
        "quantity": 1
    })).await;
    assert_eq!(status, StatusCode::OK, "create order failed: {}", body);
    assert_eq!(body["data"]["status"], "ACCEPTED");
    assert_eq!(body["data"]["unit_price"], "12.99");
    let order_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app.get(&format!("/api/v1/orders/{}/payment-breakdown", order_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["buyer_pays"], "14.29");
    assert_eq!(body["data"]["seller_receives"], "12.99");

    // One unit is now reserved
    let (_, body) = app.get(&format!("/api/v1/listings/{}", listing_id)).await;
    assert_eq!(body["data"]["available_quantity"], 2);
}

#[tokio::test]
async fn full_delivery_flow_completes_the_order() {
    let app = spawn_app();
    let john = app.register_user("john", "John Doe");
    let alice = app.register_user("alice", "Alice Smith");
    let listing_id = create_listing(&app, john, "The Great Gatsby", "10.00", 3).await;

    let (_, body) = app.post("/api/v1/orders", alice, json!({
        "listing_id": listing_id,
        "quantity": 3
    })).await;
    let order_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app.post_action(&format!("/api/v1/orders/{}/mark-delivering", order_id), john).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "DELIVERING");

    let (status, body) = app.post_action(&format!("/api/v1/orders/{}/confirm-delivery-seller", order_id), john).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "DELIVERING");
    assert_eq!(body["data"]["seller_confirmed"], true);
    assert_eq!(body["data"]["buyer_confirmed"], false);

    let (status, body) = app.post_action(&format!("/api/v1/orders/{}/confirm-delivery-buyer", order_id), alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "COMPLETED");
    assert_eq!(body["data"]["buyer_confirmed"], true);

    // Sold units stay consumed; the listing is no longer deletable
    let (_, body) = app.get(&format!("/api/v1/listings/{}", listing_id)).await;
    assert_eq!(body["data"]["available_quantity"], 0);

    let (status, body) = app.request(
        Method::DELETE,
        &format!("/api/v1/listings/{}", listing_id),
        Some(john),
        None,
    ).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "listing_not_deletable");
}

#[tokio::test]
async fn wrong_actor_gets_generic_forbidden_message() {
    let app = spawn_app();
    let john = app.register_user("john", "John Doe");
    let alice = app.register_user("alice", "Alice Smith");
    let listing_id = create_listing(&app, john, "The Great Gatsby", "12.99", 1).await;

    let (_, body) = app.post("/api/v1/orders", alice, json!({
        "listing_id": listing_id,
        "quantity": 1
    })).await;
    let order_id = body["data"]["id"].as_i64().unwrap();

    // Only the seller may mark the order as delivering
    let (status, body) = app.post_action(&format!("/api/v1/orders/{}/mark-delivering", order_id), alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "not_permitted");
    assert_eq!(body["error"]["message"], "You are not permitted to perform this action");

    // The body must not reveal which party would have been permitted
    let text = body.to_string();
    assert!(!text.contains("seller"));
    assert!(!text.contains("buyer"));
}

#[tokio::test]
async fn cancellation_restores_stock() {
    let app = spawn_app();
    let john = app.register_user("john", "John Doe");
    let alice = app.register_user("alice", "Alice Smith");
    let listing_id = create_listing(&app, john, "The Great Gatsby", "12.99", 3).await;

    let (_, body) = app.post("/api/v1/orders", alice, json!({
        "listing_id": listing_id,
        "quantity": 2
    })).await;
    let order_id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = app.get(&format!("/api/v1/listings/{}", listing_id)).await;
    assert_eq!(body["data"]["available_quantity"], 1);

    let (status, body) = app.post_action(&format!("/api/v1/orders/{}/cancel", order_id), alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CANCELLED");

    let (_, body) = app.get(&format!("/api/v1/listings/{}", listing_id)).await;
    assert_eq!(body["data"]["available_quantity"], 3);

    // Terminal orders reject further transitions
    let (status, body) = app.post_action(&format!("/api/v1/orders/{}/mark-delivering", order_id), john).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "terminal_order");
}

#[tokio::test]
async fn oversell_and_self_purchase_are_bad_requests() {
    let app = spawn_app();
    let john = app.register_user("john", "John Doe");
    let alice = app.register_user("alice", "Alice Smith");
    let listing_id = create_listing(&app, john, "The Great Gatsby", "12.99", 1).await;

    let (status, body) = app.post("/api/v1/orders", alice, json!({
        "listing_id": listing_id,
        "quantity": 5
    })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "insufficient_stock");

    let (status, body) = app.post("/api/v1/orders", john, json!({
        "listing_id": listing_id,
        "quantity": 1
    })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "self_purchase");

    // Failed attempts left the stock untouched
    let (_, body) = app.get(&format!("/api/v1/listings/{}", listing_id)).await;
    assert_eq!(body["data"]["available_quantity"], 1);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = spawn_app();

    let (status, body) = app.get("/api/v1/orders/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "order_not_found");
}

#[tokio::test]
async fn incoming_and_outgoing_views_are_role_scoped() {
    let app = spawn_app();
    let john = app.register_user("john", "John Doe");
    let alice = app.register_user("alice", "Alice Smith");
    let listing_id = create_listing(&app, john, "The Great Gatsby", "12.99", 3).await;

    let (_, body) = app.post("/api/v1/orders", alice, json!({
        "listing_id": listing_id,
        "quantity": 1
    })).await;
    let order_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app.get(&format!("/api/v1/orders/incoming/{}", john)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let view = &body["data"][0];
    assert_eq!(view["order_id"].as_i64().unwrap(), order_id);
    assert_eq!(view["listing_title"], "The Great Gatsby");
    assert_eq!(view["buyer_name"], "Alice Smith");
    assert_eq!(view["seller_name"], "John Doe");
    assert_eq!(view["total_price"], "14.29");

    let (status, body) = app.get(&format!("/api/v1/orders/outgoing/{}", alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["order_id"].as_i64().unwrap(), order_id);

    // The buyer has no incoming orders and the seller no outgoing ones
    let (_, body) = app.get(&format!("/api/v1/orders/incoming/{}", alice)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    let (_, body) = app.get(&format!("/api/v1/orders/outgoing/{}", john)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}
