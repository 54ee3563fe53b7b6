mod common;

use axum::http::{Method, StatusCode};
use common::{slug_of, TestApp};
use serde_json::{json, Value};

async fn create_user(app: &TestApp, email: &str) -> Value {
    app.post(
        "/api/v1/users",
        json!({"email": email, "full_name": "Jane Doe"}),
    )
    .await
}

fn address(user: &Value, city: &str, is_default: bool) -> Value {
    json!({
        "user_id": user["id"],
        "full_name": "Jane Doe",
        "street_address": "1 Main St",
        "city": city,
        "state": "TX",
        "postal_code": "73301",
        "country": "US",
        "is_default": is_default
    })
}

#[tokio::test]
async fn user_emails_are_unique_and_validated() {
    let app = TestApp::new().await;
    let user = create_user(&app, "jane@example.com").await;
    assert_eq!(user["email"], "jane@example.com");
    assert_eq!(user["is_active"], true);

    let duplicate = app
        .send(
            Method::POST,
            "/api/v1/users",
            Some(json!({"email": "jane@example.com"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(
        duplicate["field_errors"]["email"][0],
        "user with this email already exists."
    );

    let invalid = app
        .send(
            Method::POST,
            "/api/v1/users",
            Some(json!({"email": "not-an-email"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(
        invalid["field_errors"]["email"][0],
        "Enter a valid email address."
    );
}

#[tokio::test]
async fn second_default_address_is_rejected_on_create() {
    let app = TestApp::new().await;
    let user = create_user(&app, "jane@example.com").await;

    let home = app
        .post("/api/v1/addresses", address(&user, "Austin", true))
        .await;
    assert_eq!(home["is_default"], true);
    assert_eq!(home["user_email"], "jane@example.com");

    let body = app
        .send(
            Method::POST,
            "/api/v1/addresses",
            Some(address(&user, "Dallas", true)),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(
        body["field_errors"]["is_default"][0],
        "User already has a default address."
    );

    // A non-default address is always welcome.
    app.post("/api/v1/addresses", address(&user, "Dallas", false))
        .await;
}

#[tokio::test]
async fn promoting_an_address_clears_the_previous_default() {
    let app = TestApp::new().await;
    let user = create_user(&app, "jane@example.com").await;

    let home = app
        .post("/api/v1/addresses", address(&user, "Austin", true))
        .await;
    let office = app
        .post("/api/v1/addresses", address(&user, "Dallas", false))
        .await;

    let promoted = app
        .send(
            Method::PUT,
            &format!("/api/v1/addresses/{}", slug_of(&office)),
            Some(json!({"is_default": true})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(promoted["is_default"], true);

    let previous = app
        .get(&format!("/api/v1/addresses/{}", slug_of(&home)))
        .await;
    assert_eq!(previous["is_default"], false);
}

#[tokio::test]
async fn defaults_are_tracked_per_user() {
    let app = TestApp::new().await;
    let jane = create_user(&app, "jane@example.com").await;
    let john = create_user(&app, "john@example.com").await;

    app.post("/api/v1/addresses", address(&jane, "Austin", true))
        .await;
    app.post("/api/v1/addresses", address(&john, "Austin", true))
        .await;

    let janes = app
        .get(&format!("/api/v1/addresses?user_id={}", jane["id"].as_str().unwrap()))
        .await;
    assert_eq!(janes["pagination"]["total"], 1);
    assert_eq!(janes["data"][0]["user_email"], "jane@example.com");
}

#[tokio::test]
async fn blank_address_fields_are_rejected() {
    let app = TestApp::new().await;
    let user = create_user(&app, "jane@example.com").await;

    let mut payload = address(&user, "Austin", false);
    payload["city"] = json!("   ");

    let body = app
        .send(
            Method::POST,
            "/api/v1/addresses",
            Some(payload),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(body["field_errors"]["city"].is_array());
}

#[tokio::test]
async fn deleting_a_user_removes_their_addresses() {
    let app = TestApp::new().await;
    let user = create_user(&app, "jane@example.com").await;
    let home = app
        .post("/api/v1/addresses", address(&user, "Austin", true))
        .await;

    app.send(
        Method::DELETE,
        &format!("/api/v1/users/{}", slug_of(&user)),
        None,
        StatusCode::NO_CONTENT,
    )
    .await;

    app.send(
        Method::GET,
        &format!("/api/v1/addresses/{}", slug_of(&home)),
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}
