mod common;

use axum::http::{Method, StatusCode};
use common::{slug_of, TestApp};
use serde_json::json;

#[tokio::test]
async fn publishing_requires_a_category() {
    let app = TestApp::new().await;

    let rejected = app
        .send(
            Method::POST,
            "/api/v1/products",
            Some(json!({"name": "Trail Shoe", "sku": "TS-1", "status": "published"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(
        rejected["field_errors"]["non_field_errors"][0],
        "Published products must have a category assigned."
    );

    let category = app
        .post("/api/v1/categories", json!({"name": "Footwear"}))
        .await;
    let published = app
        .post(
            "/api/v1/products",
            json!({
                "name": "Trail Shoe",
                "sku": "TS-1",
                "status": "published",
                "category_id": category["id"]
            }),
        )
        .await;

    assert_eq!(published["status"], "published");
    assert_eq!(published["category_name"], "Footwear");
    assert_eq!(published["slug"], "trail-shoe");

    // Detaching the category from a published product is refused too.
    let detach = app
        .send(
            Method::PUT,
            "/api/v1/products/trail-shoe",
            Some(json!({"category_id": null})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(detach["field_errors"]["non_field_errors"].is_array());
}

#[tokio::test]
async fn product_defaults_are_applied() {
    let app = TestApp::new().await;

    let product = app
        .post("/api/v1/products", json!({"name": "Mug", "sku": "MUG-01"}))
        .await;

    assert_eq!(product["type"], "simple");
    assert_eq!(product["status"], "draft");
    assert_eq!(product["is_active"], true);
    assert_eq!(product["is_returnable"], true);
    assert_eq!(product["metadata"], json!({}));
}

#[tokio::test]
async fn product_sku_rules_are_enforced() {
    let app = TestApp::new().await;

    let lowercase = app
        .send(
            Method::POST,
            "/api/v1/products",
            Some(json!({"name": "Lamp", "sku": "lamp-1"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(lowercase["field_errors"]["sku"][0], "SKU must be uppercase.");

    app.post("/api/v1/products", json!({"name": "Lamp", "sku": "LAMP-1"}))
        .await;
    let duplicate = app
        .send(
            Method::POST,
            "/api/v1/products",
            Some(json!({"name": "Desk Lamp", "sku": "LAMP-1"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(
        duplicate["field_errors"]["sku"][0],
        "product with this sku already exists."
    );
}

#[tokio::test]
async fn unknown_parent_category_is_a_field_error() {
    let app = TestApp::new().await;

    let body = app
        .send(
            Method::POST,
            "/api/v1/categories",
            Some(json!({
                "name": "Orphans",
                "parent_id": "00000000-0000-0000-0000-000000000001"
            })),
            StatusCode::BAD_REQUEST,
        )
        .await;

    assert!(body["field_errors"]["parent_id"].is_array());
}

#[tokio::test]
async fn child_category_reports_its_parent() {
    let app = TestApp::new().await;
    let parent = app
        .post("/api/v1/categories", json!({"name": "Apparel"}))
        .await;

    let child = app
        .post(
            "/api/v1/categories",
            json!({"name": "Jackets", "parent_id": parent["id"]}),
        )
        .await;
    assert_eq!(child["parent_id"], parent["id"]);
    assert_eq!(child["parent_name"], "Apparel");

    let own_parent = app
        .send(
            Method::PUT,
            &format!("/api/v1/categories/{}", slug_of(&child)),
            Some(json!({"parent_id": child["id"]})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(
        own_parent["field_errors"]["parent_id"][0],
        "A category cannot be its own parent."
    );
}

#[tokio::test]
async fn category_slugs_stay_unique() {
    let app = TestApp::new().await;

    let first = app
        .post("/api/v1/categories", json!({"name": "Sale Items"}))
        .await;
    let second = app
        .post("/api/v1/categories", json!({"name": "Sale  items!"}))
        .await;

    assert_eq!(first["slug"], "sale-items");
    assert_eq!(second["slug"], "sale-items-1");
}

#[tokio::test]
async fn brand_names_are_unique() {
    let app = TestApp::new().await;
    app.post("/api/v1/brands", json!({"name": "Acme"})).await;

    let body = app
        .send(
            Method::POST,
            "/api/v1/brands",
            Some(json!({"name": "Acme"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(body["field_errors"]["name"].is_array());
}

#[tokio::test]
async fn variants_filter_by_product_slug() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let other = app
        .post("/api/v1/products", json!({"name": "Gadget", "sku": "GAD-1"}))
        .await;
    app.post(
        "/api/v1/variants",
        json!({"product_slug": slug_of(&other), "sku": "GAD-1-S", "price": 3}),
    )
    .await;

    let widgets = app
        .get(&format!("/api/v1/variants?product_slug={}", seeded.product))
        .await;
    assert_eq!(widgets["pagination"]["total"], 1);
    assert_eq!(widgets["data"][0]["sku"], "WID-1-L");
    assert_eq!(widgets["data"][0]["product_name"], "Widget");

    let all = app.get("/api/v1/variants").await;
    assert_eq!(all["pagination"]["total"], 2);
}

#[tokio::test]
async fn variant_for_unknown_product_is_a_field_error() {
    let app = TestApp::new().await;

    let body = app
        .send(
            Method::POST,
            "/api/v1/variants",
            Some(json!({"product_slug": "ghost", "sku": "G-1", "price": "1.00"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(
        body["field_errors"]["product_slug"][0],
        "Invalid product slug."
    );
}

#[tokio::test]
async fn deleting_a_product_removes_its_variants() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    app.send(
        Method::DELETE,
        &format!("/api/v1/products/{}", seeded.product),
        None,
        StatusCode::NO_CONTENT,
    )
    .await;

    app.send(
        Method::GET,
        &format!("/api/v1/variants/{}", seeded.variant),
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}
