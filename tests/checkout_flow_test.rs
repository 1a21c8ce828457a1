//! Integration tests for the checkout entry point.
//!
//! Tests cover:
//! - Free gigs materializing an order without touching the provider
//! - Paid gigs redirecting to a hosted session with no order yet
//! - Authentication and unknown-gig handling

mod common;

use std::sync::atomic::Ordering;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use gigmarket_api::handlers::orders::OrderResponse;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use url::Url;
use uuid::Uuid;

#[tokio::test]
async fn free_gig_checkout_creates_an_order_immediately() {
    let app = TestApp::new().await;
    let seller = Uuid::new_v4();
    let buyer = Uuid::new_v4();
    let gig = app.seed_gig(seller, None).await;

    let response = app
        .request_as(
            buyer,
            Method::POST,
            &format!("/api/v1/orders/checkout/{}", gig.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let url = Url::parse(body["url"].as_str().expect("redirect url")).unwrap();
    let query = url.query().unwrap_or_default();
    assert!(query.contains("success=true"));
    assert!(query.contains("free=true"));

    let order_id = url
        .query_pairs()
        .find(|(key, _)| key == "order")
        .map(|(_, value)| value.to_string())
        .expect("order id in redirect");

    // The provider was never involved.
    assert_eq!(app.gateway.session_creates.load(Ordering::SeqCst), 0);

    let response = app
        .request_as(
            buyer,
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let order: OrderResponse = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(order.status, "active");
    assert_eq!(order.price, Decimal::ZERO);
    assert_eq!(order.buyer_id, buyer);
    assert_eq!(order.seller_id, seller);
    assert!(order.checkout_session_id.is_none());
    assert!(order.payment_intent_id.is_none());
}

#[tokio::test]
async fn paid_gig_checkout_defers_the_order_to_reconciliation() {
    let app = TestApp::new().await;
    let buyer = Uuid::new_v4();
    let gig = app.seed_gig(Uuid::new_v4(), Some(dec!(25.00))).await;

    let response = app
        .request_as(
            buyer,
            Method::POST,
            &format!("/api/v1/orders/checkout/{}", gig.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let redirect = body["url"].as_str().expect("redirect url");
    assert!(redirect.starts_with("https://pay.example/s/cs_test_"));
    assert_eq!(app.gateway.session_creates.load(Ordering::SeqCst), 1);

    // The session carries everything reconciliation will need later.
    let session = app.gateway.session("cs_test_1").expect("session stored");
    assert_eq!(session.amount_total, Some(2500));
    assert_eq!(session.metadata.buyer_id, Some(buyer.to_string()));
    assert_eq!(session.metadata.gig_id, Some(gig.id.to_string()));

    // No order exists until a confirmation path runs.
    let response = app
        .request_as(buyer, Method::GET, "/api/v1/orders", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn checkout_requires_authentication() {
    let app = TestApp::new().await;
    let gig = app.seed_gig(Uuid::new_v4(), None).await;
    let uri = format!("/api/v1/orders/checkout/{}", gig.id);

    let anonymous = app.request(Method::POST, &uri, None, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let forged = app
        .request(Method::POST, &uri, None, Some("not-a-real-token"))
        .await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_of_a_missing_gig_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_as(
            Uuid::new_v4(),
            Method::POST,
            &format!("/api/v1/orders/checkout/{}", Uuid::new_v4()),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Not Found");
    assert!(body["message"].as_str().unwrap().contains("Gig not found"));
    assert!(body["request_id"].is_string());
}
