//! Router-level tests for the HTTP surface
//!
//! Drives the real router over an in-process store and asserts the JSON
//! error contract: every failure a client can provoke comes back as
//! `{"error": CODE, "message": ...}`, including bodies the typed
//! extractor cannot decode.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use gateway::router::create_router;
use gateway::state::AppState;
use matching_engine::Engine;
use serde_json::Value;
use std::sync::Arc;
use store::{Store, SyncPolicy};
use tempfile::TempDir;
use tower::ServiceExt;

fn test_app(tmp: &TempDir) -> Router {
    let store = Arc::new(Store::open(tmp.path(), SyncPolicy::Never).unwrap());
    let engine = Arc::new(Engine::new(store));
    engine.recover().unwrap();
    create_router(AppState::new(engine, "XYZ".to_string()))
}

async fn post_order(app: Router, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn unknown_side_returns_validation_error_body() {
    let tmp = TempDir::new().unwrap();
    let (status, body) = post_order(
        test_app(&tmp),
        r#"{"kind": "limit", "side": "hold", "price": "100", "quantity": "10"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("unknown side: hold"));
}

#[tokio::test]
async fn unknown_kind_returns_validation_error_body() {
    let tmp = TempDir::new().unwrap();
    let (status, body) = post_order(
        test_app(&tmp),
        r#"{"kind": "stop", "side": "buy", "price": "100", "quantity": "10"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("unknown kind: stop"));
}

#[tokio::test]
async fn undecodable_body_returns_validation_error_body() {
    let tmp = TempDir::new().unwrap();
    // Negative quantity fails typed deserialization before the handler
    // sees it; the rejection must still use the JSON error shape
    let (status, body) = post_order(
        test_app(&tmp),
        r#"{"kind": "market", "side": "sell", "quantity": "-3"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION");
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn market_unfillable_returns_taxonomy_error() {
    let tmp = TempDir::new().unwrap();
    let (status, body) = post_order(
        test_app(&tmp),
        r#"{"kind": "market", "side": "buy", "quantity": "1"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "MARKET_UNFILLABLE");
}

#[tokio::test]
async fn placement_round_trip() {
    let tmp = TempDir::new().unwrap();
    let app = test_app(&tmp);

    let (status, body) = post_order(
        app.clone(),
        r#"{"kind": "limit", "side": "sell", "price": "100", "quantity": "10"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "open");
    assert_eq!(body["remaining_quantity"], "10");

    let (status, body) = post_order(
        app.clone(),
        r#"{"side": "buy", "kind": "limit", "price": "100", "quantity": "4"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "filled");
    let trades = body["trades"].as_array().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0]["price"], "100");
    assert_eq!(trades[0]["quantity"], "4");

    // Omitted symbol defaulted on the persisted row
    let (status, body) = get(app, "/orders/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "XYZ");
    assert_eq!(body["status"], "partially_filled");
}

async fn delete(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn cancel_then_cancel_again_conflicts() {
    let tmp = TempDir::new().unwrap();
    let app = test_app(&tmp);

    post_order(
        app.clone(),
        r#"{"kind": "limit", "side": "buy", "price": "50", "quantity": "10"}"#,
    )
    .await;

    let (status, body) = delete(app.clone(), "/orders/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "canceled");

    let (status, body) = delete(app.clone(), "/orders/1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ORDER_TERMINAL");

    let (status, body) = delete(app, "/orders/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn orderbook_and_trades_listing() {
    let tmp = TempDir::new().unwrap();
    let app = test_app(&tmp);

    post_order(
        app.clone(),
        r#"{"kind": "limit", "side": "sell", "price": "101", "quantity": "5"}"#,
    )
    .await;
    post_order(
        app.clone(),
        r#"{"kind": "limit", "side": "buy", "price": "99", "quantity": "3"}"#,
    )
    .await;
    post_order(
        app.clone(),
        r#"{"kind": "limit", "side": "buy", "price": "101", "quantity": "2"}"#,
    )
    .await;

    let (status, body) = get(app.clone(), "/orderbook").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["buy_orders"].as_array().unwrap().len(), 1);
    let sells = body["sell_orders"].as_array().unwrap();
    assert_eq!(sells.len(), 1);
    assert_eq!(sells[0]["quantity"], "3");

    let (status, body) = get(app.clone(), "/trades").await;
    assert_eq!(status, StatusCode::OK);
    let trades = body["trades"].as_array().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0]["price"], "101");
    assert_eq!(trades[0]["quantity"], "2");

    let (status, body) = get(app, "/orders").await;
    assert_eq!(status, StatusCode::OK);
    // Newest first
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 3);
    assert_eq!(orders[0]["id"], 3);
    assert_eq!(orders[2]["id"], 1);
}

#[tokio::test]
async fn health_endpoint() {
    let tmp = TempDir::new().unwrap();
    let (status, body) = get(test_app(&tmp), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
