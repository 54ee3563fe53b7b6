mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use backoffice_api::auth::consts as perm;
use common::{response_json, TestApp};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/warehouses", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/warehouses", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn permissions_are_checked_per_method() {
    let app = TestApp::new().await;
    let reader = app.token_with(&[perm::STOCKS_READ]);

    let list = app
        .request(Method::GET, "/api/v1/stocks", None, Some(&reader))
        .await;
    assert_eq!(list.status(), StatusCode::OK);

    let create = app
        .request(
            Method::POST,
            "/api/v1/stocks",
            Some(json!({"product_slug": "p", "warehouse_slug": "w"})),
            Some(&reader),
        )
        .await;
    assert_eq!(create.status(), StatusCode::FORBIDDEN);

    let elsewhere = app
        .request(Method::GET, "/api/v1/warehouses", None, Some(&reader))
        .await;
    assert_eq!(elsewhere.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn resource_wildcard_grants_every_action() {
    let app = TestApp::new().await;
    let operator = app.token_with(&["warehouses:*"]);

    let created = app
        .request(
            Method::POST,
            "/api/v1/warehouses",
            Some(json!({"name": "North"})),
            Some(&operator),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let removed = app
        .request(
            Method::DELETE,
            "/api/v1/warehouses/north",
            None,
            Some(&operator),
        )
        .await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn probes_and_status_are_public() {
    let app = TestApp::new().await;

    for uri in ["/health", "/health/live", "/health/ready", "/api/v1/status"] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }

    let status = response_json(
        app.request(Method::GET, "/api/v1/status", None, None)
            .await,
    )
    .await;
    assert_eq!(status["status"], "ok");
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert!(response.headers().contains_key("x-request-id"));

    let echoed = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/health/live")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(echoed.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/warehouses")
                .header("authorization", format!("Bearer {}", app.token()))
                .header("content-type", "application/json")
                .body(Body::from("{\"name\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Bad Request");
}

#[tokio::test]
async fn blank_required_fields_are_reported_per_field() {
    let app = TestApp::new().await;

    let body = app
        .send(
            Method::POST,
            "/api/v1/warehouses",
            Some(json!({"name": "   "})),
            StatusCode::BAD_REQUEST,
        )
        .await;

    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["field_errors"]["name"][0], "This field may not be blank.");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn invalid_pagination_is_rejected() {
    let app = TestApp::new().await;

    app.send(
        Method::GET,
        "/api/v1/warehouses?per_page=0",
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;

    for uri in [
        "/api/v1/warehouses?page=18446744073709551615",
        "/api/v1/stocks?page=18446744073709551615&per_page=100",
        "/api/v1/products?page=9223372036854775807",
    ] {
        let body = app.send(Method::GET, uri, None, StatusCode::BAD_REQUEST).await;
        assert_eq!(body["error"], "Bad Request", "{uri}");
    }

    let capped = app.get("/api/v1/warehouses?per_page=1000").await;
    assert_eq!(capped["pagination"]["per_page"], 100);
    assert_eq!(capped["pagination"]["page"], 1);
    assert_eq!(capped["pagination"]["total"], 0);
}
