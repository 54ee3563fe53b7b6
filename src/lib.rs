//! Back Office API Library
//!
//! Inventory and pricing ledger with its catalog and account collaborators,
//! exposed as a JSON API over axum and SeaORM.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod slug;
pub mod tracing;

use axum::{
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;

use crate::auth::AuthService;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone());
        Self {
            db,
            config,
            services,
        }
    }
}

/// Versioned API surface, mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        // Inventory & pricing ledger
        .nest("/warehouses", handlers::ledger::warehouses_routes())
        .nest("/stocks", handlers::ledger::stocks_routes())
        .nest("/product-prices", handlers::ledger::product_prices_routes())
        .nest(
            "/stock-transactions",
            handlers::ledger::stock_transactions_routes(),
        )
        // Catalog
        .nest("/categories", handlers::catalog::categories_routes())
        .nest("/brands", handlers::catalog::brands_routes())
        .nest("/products", handlers::catalog::products_routes())
        .nest("/variants", handlers::catalog::variants_routes())
        // Accounts
        .nest("/users", handlers::accounts::users_routes())
        .nest("/addresses", handlers::accounts::addresses_routes())
}

/// Full application router: health probes, the v1 API and Swagger UI.
///
/// Transport concerns such as CORS and compression are layered by the binary.
pub fn app_router(state: AppState, auth_service: Arc<AuthService>) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::health_routes(state.db.clone()))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Inject AuthService into request extensions for auth middleware
        .layer(Extension(auth_service))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "service": "backoffice-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::db::DbPool;
    pub use crate::errors::{ApiError, ServiceError};
    pub use crate::services::*;
    pub use crate::{app_router, AppState};
}
