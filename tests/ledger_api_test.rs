//! End-to-end tests for the inventory & pricing ledger.
//!
//! Tests cover:
//! - Warehouse slug assignment and name uniqueness
//! - Stock composite-key uniqueness, including product-level rows
//! - Price book reference resolution and money rules
//! - Transaction log independence from stock counters

mod common;

use std::str::FromStr;

use axum::http::{Method, StatusCode};
use common::{slug_of, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        other => Decimal::from_str(&other.to_string()).expect("decimal number"),
    }
}

// ==================== Warehouses ====================

#[tokio::test]
async fn warehouses_slugged_from_the_same_text_get_distinct_slugs() {
    let app = TestApp::new().await;

    let first = app
        .post("/api/v1/warehouses", json!({"name": "Central"}))
        .await;
    let second = app
        .post("/api/v1/warehouses", json!({"name": "central"}))
        .await;

    assert_eq!(first["slug"], "central");
    assert_eq!(second["slug"], "central-1");

    let fetched = app.get("/api/v1/warehouses/central-1").await;
    assert_eq!(fetched["name"], "central");
}

#[tokio::test]
async fn warehouse_slug_survives_a_rename() {
    let app = TestApp::new().await;
    app.post("/api/v1/warehouses", json!({"name": "East Hub"}))
        .await;

    let renamed = app
        .send(
            Method::PUT,
            "/api/v1/warehouses/east-hub",
            Some(json!({"name": "Eastern Hub", "city": "Boston"})),
            StatusCode::OK,
        )
        .await;

    assert_eq!(renamed["slug"], "east-hub");
    assert_eq!(renamed["name"], "Eastern Hub");
    assert_eq!(renamed["city"], "Boston");
}

#[tokio::test]
async fn duplicate_warehouse_name_is_a_field_error() {
    let app = TestApp::new().await;
    app.post("/api/v1/warehouses", json!({"name": "Central"}))
        .await;

    let body = app
        .send(
            Method::POST,
            "/api/v1/warehouses",
            Some(json!({"name": "Central"})),
            StatusCode::BAD_REQUEST,
        )
        .await;

    assert_eq!(
        body["field_errors"]["name"][0],
        "A warehouse with this name already exists."
    );
}

#[tokio::test]
async fn warehouses_list_is_paginated_by_name() {
    let app = TestApp::new().await;
    for name in ["Zulu", "Alpha", "Mike"] {
        app.post("/api/v1/warehouses", json!({"name": name})).await;
    }

    let page = app.get("/api/v1/warehouses?page=1&per_page=2").await;
    let names: Vec<&str> = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["name"].as_str().unwrap())
        .collect();

    assert_eq!(names, vec!["Alpha", "Mike"]);
    assert_eq!(page["pagination"]["total"], 3);
    assert_eq!(page["pagination"]["total_pages"], 2);
}

#[tokio::test]
async fn unknown_warehouse_slug_is_not_found() {
    let app = TestApp::new().await;
    app.send(
        Method::GET,
        "/api/v1/warehouses/nowhere",
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}

// ==================== Stocks ====================

#[tokio::test]
async fn stock_round_trip_keeps_every_counter() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    let created = app
        .post(
            "/api/v1/stocks",
            json!({
                "product_slug": seeded.product,
                "variant_slug": seeded.variant,
                "warehouse_slug": seeded.warehouse,
                "quantity": 10,
                "reserved_quantity": 2
            }),
        )
        .await;

    let id = created["id"].as_str().unwrap();
    let fetched = app.get(&format!("/api/v1/stocks/{id}")).await;

    assert_eq!(fetched["quantity"], 10);
    assert_eq!(fetched["reserved_quantity"], 2);
    assert_eq!(fetched["min_quantity"], 0);
    assert_eq!(fetched["max_quantity"], 0);
    assert_eq!(fetched["is_active"], true);
    assert_eq!(fetched["product_slug"], seeded.product.as_str());
    assert_eq!(fetched["variant_slug"], seeded.variant.as_str());
    assert_eq!(fetched["warehouse_slug"], seeded.warehouse.as_str());
    assert_eq!(fetched["label"], "Widget - Large @ Central");
    assert_eq!(fetched["slug"], "widget-large-central");
    assert_eq!(fetched["created_at"], created["created_at"]);
}

#[tokio::test]
async fn duplicate_stock_triples_are_rejected_with_and_without_variant() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    let product_level = json!({
        "product_slug": seeded.product,
        "warehouse_slug": seeded.warehouse,
        "quantity": 5
    });
    let variant_level = json!({
        "product_slug": seeded.product,
        "variant_slug": seeded.variant,
        "warehouse_slug": seeded.warehouse
    });

    app.post("/api/v1/stocks", product_level.clone()).await;
    app.post("/api/v1/stocks", variant_level.clone()).await;

    for payload in [product_level, variant_level] {
        let body = app
            .send(
                Method::POST,
                "/api/v1/stocks",
                Some(payload),
                StatusCode::BAD_REQUEST,
            )
            .await;
        assert_eq!(
            body["field_errors"]["non_field_errors"][0],
            "The fields product, variant, warehouse must make a unique set."
        );
    }

    let list = app.get("/api/v1/stocks").await;
    assert_eq!(list["pagination"]["total"], 2);
}

#[tokio::test]
async fn moving_a_stock_onto_an_existing_triple_is_rejected() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let west = app
        .post("/api/v1/warehouses", json!({"name": "West"}))
        .await;

    app.post(
        "/api/v1/stocks",
        json!({
            "product_slug": seeded.product,
            "variant_slug": seeded.variant,
            "warehouse_slug": seeded.warehouse
        }),
    )
    .await;
    let other = app
        .post(
            "/api/v1/stocks",
            json!({
                "product_slug": seeded.product,
                "variant_slug": seeded.variant,
                "warehouse_slug": slug_of(&west)
            }),
        )
        .await;
    let id = other["id"].as_str().unwrap();

    // Updating a row's own counters never collides with itself.
    let updated = app
        .send(
            Method::PUT,
            &format!("/api/v1/stocks/{id}"),
            Some(json!({"quantity": 7, "reserved_quantity": 99})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(updated["quantity"], 7);
    assert_eq!(updated["reserved_quantity"], 99);

    let body = app
        .send(
            Method::PUT,
            &format!("/api/v1/stocks/{id}"),
            Some(json!({"warehouse_slug": seeded.warehouse})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(
        body["field_errors"]["non_field_errors"][0],
        "The fields product, variant, warehouse must make a unique set."
    );

    let unchanged = app.get(&format!("/api/v1/stocks/{id}")).await;
    assert_eq!(unchanged["warehouse_slug"], slug_of(&west).as_str());
}

#[tokio::test]
async fn stock_with_unknown_references_is_a_field_error() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    let body = app
        .send(
            Method::POST,
            "/api/v1/stocks",
            Some(json!({"product_slug": seeded.product, "warehouse_slug": "missing"})),
            StatusCode::BAD_REQUEST,
        )
        .await;

    assert_eq!(
        body["field_errors"]["warehouse_slug"][0],
        "Invalid warehouse slug."
    );
}

#[tokio::test]
async fn malformed_stock_id_is_not_found() {
    let app = TestApp::new().await;
    app.send(
        Method::GET,
        "/api/v1/stocks/not-a-uuid",
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn deleting_a_warehouse_cascades_to_its_stock() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let stock = app
        .post(
            "/api/v1/stocks",
            json!({"product_slug": seeded.product, "warehouse_slug": seeded.warehouse}),
        )
        .await;

    app.send(
        Method::DELETE,
        &format!("/api/v1/warehouses/{}", seeded.warehouse),
        None,
        StatusCode::NO_CONTENT,
    )
    .await;

    app.send(
        Method::GET,
        &format!("/api/v1/stocks/{}", stock["id"].as_str().unwrap()),
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}

// ==================== Product prices ====================

#[tokio::test]
async fn price_with_unknown_warehouse_creates_nothing() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    let body = app
        .send(
            Method::POST,
            "/api/v1/product-prices",
            Some(json!({
                "product_slug": seeded.product,
                "warehouse_slug": "no-such-warehouse",
                "price": "10.00"
            })),
            StatusCode::BAD_REQUEST,
        )
        .await;

    assert_eq!(
        body["field_errors"]["warehouse_slug"][0],
        "Invalid warehouse slug."
    );
    let list = app.get("/api/v1/product-prices").await;
    assert_eq!(list["pagination"]["total"], 0);
}

#[tokio::test]
async fn global_and_warehouse_prices_coexist() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    let global = app
        .post(
            "/api/v1/product-prices",
            json!({"product_slug": seeded.product, "price": "19.99"}),
        )
        .await;
    let local = app
        .post(
            "/api/v1/product-prices",
            json!({
                "product_slug": seeded.product,
                "warehouse_slug": seeded.warehouse,
                "price": 17.5,
                "currency": "eur"
            }),
        )
        .await;

    assert_eq!(global["warehouse_slug"], Value::Null);
    assert_eq!(global["currency"], "USD");
    assert_eq!(global["slug"], "widget-global-price");
    assert_eq!(decimal(&global["price"]), dec!(19.99));

    assert_eq!(local["warehouse_slug"], seeded.warehouse.as_str());
    assert_eq!(local["currency"], "EUR");
    assert_eq!(decimal(&local["price"]), dec!(17.50));

    let duplicate = app
        .send(
            Method::POST,
            "/api/v1/product-prices",
            Some(json!({"product_slug": seeded.product, "price": "1.00"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(duplicate["field_errors"]["non_field_errors"].is_array());
}

#[tokio::test]
async fn padded_currency_codes_are_trimmed_before_length_checks() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    let price = app
        .post(
            "/api/v1/product-prices",
            json!({"product_slug": seeded.product, "price": "3.00", "currency": " usd  "}),
        )
        .await;
    assert_eq!(price["currency"], "USD");

    let id = price["id"].as_str().unwrap();
    let updated = app
        .send(
            Method::PUT,
            &format!("/api/v1/product-prices/{id}"),
            Some(json!({"currency": "  gbp "})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(updated["currency"], "GBP");

    let too_long = app
        .send(
            Method::PUT,
            &format!("/api/v1/product-prices/{id}"),
            Some(json!({"currency": "dollars"})),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(too_long["field_errors"]["currency"].is_array());
}

#[tokio::test]
async fn negative_prices_are_rejected_per_field() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    let body = app
        .send(
            Method::POST,
            "/api/v1/product-prices",
            Some(json!({
                "product_slug": seeded.product,
                "price": "5.00",
                "cost_price": "-1.00"
            })),
            StatusCode::BAD_REQUEST,
        )
        .await;

    assert!(body["field_errors"]["cost_price"].is_array());
    assert!(body["field_errors"].get("price").is_none());
}

// ==================== Stock transactions ====================

#[tokio::test]
async fn transactions_never_touch_stock_counters() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let stock = app
        .post(
            "/api/v1/stocks",
            json!({
                "product_slug": seeded.product,
                "variant_slug": seeded.variant,
                "warehouse_slug": seeded.warehouse,
                "quantity": 10
            }),
        )
        .await;
    let stock_id = stock["id"].as_str().unwrap();

    let transaction = app
        .post(
            "/api/v1/stock-transactions",
            json!({
                "stock_id": stock_id,
                "type": "sale",
                "quantity": -3,
                "reference": "ORD-1001"
            }),
        )
        .await;

    assert_eq!(transaction["type"], "sale");
    assert_eq!(transaction["quantity"], -3);
    assert_eq!(transaction["stock_label"], "Widget - Large @ Central");
    assert_eq!(transaction["slug"], "widget-large-central-sale-3");

    let transaction_id = transaction["id"].as_str().unwrap();
    app.send(
        Method::PUT,
        &format!("/api/v1/stock-transactions/{transaction_id}"),
        Some(json!({"quantity": -4, "note": "recount"})),
        StatusCode::OK,
    )
    .await;
    app.send(
        Method::DELETE,
        &format!("/api/v1/stock-transactions/{transaction_id}"),
        None,
        StatusCode::NO_CONTENT,
    )
    .await;

    let after = app.get(&format!("/api/v1/stocks/{stock_id}")).await;
    assert_eq!(after["quantity"], 10);
    assert_eq!(after["reserved_quantity"], 0);
}

#[tokio::test]
async fn transaction_log_filters_by_type() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let stock = app
        .post(
            "/api/v1/stocks",
            json!({"product_slug": seeded.product, "warehouse_slug": seeded.warehouse}),
        )
        .await;
    let stock_id = stock["id"].as_str().unwrap();

    for (kind, quantity) in [("adjustment", 4), ("sale", -1), ("return", 1)] {
        app.post(
            "/api/v1/stock-transactions",
            json!({"stock_id": stock_id, "type": kind, "quantity": quantity}),
        )
        .await;
    }

    let sales = app
        .get(&format!(
            "/api/v1/stock-transactions?stock_id={stock_id}&type=sale"
        ))
        .await;
    assert_eq!(sales["pagination"]["total"], 1);
    assert_eq!(sales["data"][0]["type"], "sale");

    let bad = app
        .send(
            Method::GET,
            "/api/v1/stock-transactions?type=theft",
            None,
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(bad["field_errors"]["type"][0], "\"theft\" is not a valid choice.");
}

#[tokio::test]
async fn transaction_for_unknown_stock_is_a_field_error() {
    let app = TestApp::new().await;

    let body = app
        .send(
            Method::POST,
            "/api/v1/stock-transactions",
            Some(json!({
                "stock_id": "00000000-0000-0000-0000-000000000000",
                "type": "adjustment",
                "quantity": 1
            })),
            StatusCode::BAD_REQUEST,
        )
        .await;

    assert!(body["field_errors"]["stock_id"].is_array());
}
