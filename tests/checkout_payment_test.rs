//! Checkout and payment over HTTP: billing-address capture, payment route
//! selection, gateway charging with classified failures, and order
//! finalization.

mod common;

use axum::{
    body,
    http::{Method, StatusCode},
    response::Response,
};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use checkout_api::gateway::GatewayError;

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal fields serialize as strings")
        .parse()
        .expect("decimal field parses")
}

fn checkout_payload() -> Value {
    json!({
        "street_address": "1 Main St",
        "apartment_address": "Apt 4",
        "country": "us",
        "zip": "94105",
        "payment_option": "S"
    })
}

/// Seed an item, fill a cart with it and submit the checkout form.
async fn cart_through_checkout(app: &TestApp, token: &str) {
    app.seed_item("blue-shirt", "Blue shirt", dec!(20.00), None)
        .await;
    app.request(
        Method::POST,
        "/api/v1/cart/items/blue-shirt",
        None,
        Some(token),
    )
    .await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(checkout_payload()),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ==================== Checkout ====================

#[tokio::test]
async fn checkout_without_a_cart_is_a_404() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4());

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(checkout_payload()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["message"], "You do not have an active order");
}

#[tokio::test]
async fn checkout_attaches_the_billing_address() {
    let app = TestApp::new().await;
    app.seed_item("blue-shirt", "Blue shirt", dec!(20.00), None)
        .await;
    let token = app.token_for(Uuid::new_v4());

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items/blue-shirt",
            None,
            Some(&token),
        )
        .await;
    let order_id = response_json(response).await["data"]["order_id"]
        .as_str()
        .expect("order id")
        .to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(checkout_payload()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["order_id"], order_id.as_str());
    assert_eq!(body["data"]["payment_provider"], "stripe");
    assert!(body["data"]["billing_address_id"].as_str().is_some());
}

#[tokio::test]
async fn checkout_validates_the_address_form() {
    let app = TestApp::new().await;
    app.seed_item("blue-shirt", "Blue shirt", dec!(20.00), None)
        .await;
    let token = app.token_for(Uuid::new_v4());
    app.request(
        Method::POST,
        "/api/v1/cart/items/blue-shirt",
        None,
        Some(&token),
    )
    .await;

    let mut blank_street = checkout_payload();
    blank_street["street_address"] = json!("   ");
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(blank_street),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut bad_country = checkout_payload();
    bad_country["country"] = json!("USA");
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(bad_country),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_payment_option_fails_but_keeps_the_address() {
    let app = TestApp::new().await;
    app.seed_item("blue-shirt", "Blue shirt", dec!(20.00), None)
        .await;
    let token = app.token_for(Uuid::new_v4());
    app.request(
        Method::POST,
        "/api/v1/cart/items/blue-shirt",
        None,
        Some(&token),
    )
    .await;

    let mut payload = checkout_payload();
    payload["payment_option"] = json!("X");
    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Invalid payment option selected.");

    // The address was committed before the option check, so the charge
    // can proceed without resubmitting the form
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/payment/stripe",
            Some(json!({ "source_token": "tok_visa" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ==================== Charging ====================

#[tokio::test]
async fn charging_without_a_billing_address_is_rejected() {
    let app = TestApp::new().await;
    app.seed_item("blue-shirt", "Blue shirt", dec!(20.00), None)
        .await;
    let token = app.token_for(Uuid::new_v4());
    app.request(
        Method::POST,
        "/api/v1/cart/items/blue-shirt",
        None,
        Some(&token),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/payment/stripe",
            Some(json!({ "source_token": "tok_visa" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "You have not added a billing address");

    // No gateway traffic happened
    assert!(app.gateway.calls().await.is_empty());
}

#[tokio::test]
async fn unknown_provider_segment_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4());
    cart_through_checkout(&app, &token).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/payment/square",
            Some(json!({ "source_token": "tok_visa" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Invalid payment option selected.");
}

#[tokio::test]
async fn successful_charge_finalizes_the_order() {
    let app = TestApp::new().await;
    app.seed_item("blue-shirt", "Blue shirt", dec!(20.00), None)
        .await;
    app.seed_item("red-hat", "Red hat", dec!(10.00), None).await;
    app.seed_coupon("WELCOME10", dec!(10.00)).await;
    let token = app.token_for(Uuid::new_v4());

    app.request(
        Method::POST,
        "/api/v1/cart/items/blue-shirt",
        None,
        Some(&token),
    )
    .await;
    app.request(
        Method::POST,
        "/api/v1/cart/items/blue-shirt",
        None,
        Some(&token),
    )
    .await;
    app.request(Method::POST, "/api/v1/cart/items/red-hat", None, Some(&token))
        .await;
    app.request(
        Method::POST,
        "/api/v1/cart/coupon",
        Some(json!({ "code": "WELCOME10" })),
        Some(&token),
    )
    .await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(checkout_payload()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Two shirts at 20 plus one hat at 10, minus the coupon: 40.00
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/payment/stripe",
            Some(json!({ "source_token": "tok_visa" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Your order was successful!");
    assert_eq!(decimal(&body["data"]["amount"]), dec!(40.00));
    let reference_code = body["data"]["reference_code"]
        .as_str()
        .expect("reference code");
    assert_eq!(reference_code.len(), 20);
    assert!(reference_code
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

    // The gateway was charged in minor units
    let calls = app.gateway.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].amount_minor_units, 4000);
    assert_eq!(calls[0].currency, "usd");
    assert_eq!(calls[0].source_token, "tok_visa");

    // The active order is released: the cart is gone
    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A new add opens a fresh cart rather than resurrecting ordered lines
    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items/blue-shirt",
            None,
            Some(&token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["message"], "This item was added to your cart");
    assert_eq!(body["data"]["lines"][0]["quantity"], 1);
}

#[tokio::test]
async fn declined_card_maps_to_402_and_leaves_the_order_open() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4());
    cart_through_checkout(&app, &token).await;

    app.gateway
        .script(Err(GatewayError::CardDeclined {
            message: "Your card has insufficient funds.".to_string(),
        }))
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/payment/stripe",
            Some(json!({ "source_token": "tok_chargeDeclined" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Your card has insufficient funds.");

    // The cart survived the decline
    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A retry with a working card goes through
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/payment/stripe",
            Some(json!({ "source_token": "tok_visa" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn gateway_failure_classes_map_to_distinct_statuses() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4());
    cart_through_checkout(&app, &token).await;

    let cases = [
        (
            GatewayError::RateLimited,
            StatusCode::SERVICE_UNAVAILABLE,
            "Rate limit error.",
        ),
        (
            GatewayError::InvalidRequest,
            StatusCode::BAD_REQUEST,
            "Invalid parameters.",
        ),
        (
            GatewayError::AuthFailed,
            StatusCode::BAD_GATEWAY,
            "Not authenticated.",
        ),
        (
            GatewayError::NetworkError,
            StatusCode::BAD_GATEWAY,
            "Network error.",
        ),
        (
            GatewayError::Generic,
            StatusCode::BAD_GATEWAY,
            "Something went wrong. You were not charged. Please try again.",
        ),
    ];

    for (error, expected_status, expected_message) in cases {
        app.gateway.script(Err(error)).await;

        let response = app
            .request(
                Method::POST,
                "/api/v1/checkout/payment/stripe",
                Some(json!({ "source_token": "tok_visa" })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), expected_status);
        let body = response_json(response).await;
        assert_eq!(body["message"], expected_message);
    }

    // Every failure left the order open
    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn charge_requires_a_source_token() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4());
    cart_through_checkout(&app, &token).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/payment/stripe",
            Some(json!({ "source_token": "" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.gateway.calls().await.is_empty());
}
