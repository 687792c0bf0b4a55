//! Refund intake over HTTP: filing against a finalized order's reference
//! code, marking the order, and appending refund records.

mod common;

use axum::{
    body,
    http::{Method, StatusCode},
    response::Response,
};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use uuid::Uuid;

use checkout_api::entities::{order, refund, Order, Refund};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Drive a cart through checkout and payment; returns the order's reference
/// code.
async fn finalize_an_order(app: &TestApp, token: &str) -> String {
    app.seed_item("blue-shirt", "Blue shirt", dec!(20.00), None)
        .await;
    app.request(
        Method::POST,
        "/api/v1/cart/items/blue-shirt",
        None,
        Some(token),
    )
    .await;
    app.request(
        Method::POST,
        "/api/v1/checkout",
        Some(json!({
            "street_address": "1 Main St",
            "country": "US",
            "zip": "94105",
            "payment_option": "S"
        })),
        Some(token),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout/payment/stripe",
            Some(json!({ "source_token": "tok_visa" })),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await["data"]["reference_code"]
        .as_str()
        .expect("reference code")
        .to_string()
}

#[tokio::test]
async fn refund_request_marks_the_order_and_records_the_request() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4());
    let reference_code = finalize_an_order(&app, &token).await;

    // Intake is public: no bearer token on the request
    let response = app
        .request(
            Method::POST,
            "/api/v1/refunds",
            Some(json!({
                "reference_code": reference_code,
                "reason": "Arrived damaged",
                "email": "  jo@example.com  "
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Your request was received.");
    let order_id: Uuid = body["data"]["order_id"]
        .as_str()
        .expect("order id")
        .parse()
        .expect("order id is a uuid");

    let order = Order::find_by_id(order_id)
        .one(&*app.state.db)
        .await
        .expect("load order")
        .expect("order exists");
    assert!(order.refund_requested);

    let refunds = Refund::find()
        .filter(refund::Column::OrderId.eq(order_id))
        .all(&*app.state.db)
        .await
        .expect("load refunds");
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].email, "jo@example.com");
    assert_eq!(refunds[0].reason, "Arrived damaged");
    assert!(!refunds[0].accepted);
}

#[tokio::test]
async fn reference_codes_are_matched_after_trimming() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4());
    let reference_code = finalize_an_order(&app, &token).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/refunds",
            Some(json!({
                "reference_code": format!("  {}  ", reference_code),
                "reason": "Wrong size",
                "email": "jo@example.com"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn repeat_requests_append_further_records() {
    let app = TestApp::new().await;
    let token = app.token_for(Uuid::new_v4());
    let reference_code = finalize_an_order(&app, &token).await;

    for reason in ["Arrived damaged", "Changed my mind"] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/refunds",
                Some(json!({
                    "reference_code": reference_code,
                    "reason": reason,
                    "email": "jo@example.com"
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let order = Order::find()
        .filter(order::Column::ReferenceCode.eq(reference_code.as_str()))
        .one(&*app.state.db)
        .await
        .expect("load order")
        .expect("order exists");
    let refunds = Refund::find()
        .filter(refund::Column::OrderId.eq(order.id))
        .all(&*app.state.db)
        .await
        .expect("load refunds");
    assert_eq!(refunds.len(), 2);
}

#[tokio::test]
async fn unknown_reference_code_is_a_404() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/refunds",
            Some(json!({
                "reference_code": "nosuchcode1234567890",
                "reason": "Arrived damaged",
                "email": "jo@example.com"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["message"], "This order does not exist");
}

#[tokio::test]
async fn refund_payload_is_validated() {
    let app = TestApp::new().await;

    // Malformed email
    let response = app
        .request(
            Method::POST,
            "/api/v1/refunds",
            Some(json!({
                "reference_code": "nosuchcode1234567890",
                "reason": "Arrived damaged",
                "email": "not-an-email"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Empty reason
    let response = app
        .request(
            Method::POST,
            "/api/v1/refunds",
            Some(json!({
                "reference_code": "nosuchcode1234567890",
                "reason": "",
                "email": "jo@example.com"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
