#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use backoffice_api::{
    auth::{AuthConfig, AuthService, ADMIN_ROLE},
    config::AppConfig,
    db, AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str =
    "k3Vb9QzLx7Tn2WmRp8YcFh4JdSa6GeUo1NiXtBvKq5ZwMyPl0CrEsDgHjAuOfIbW";

/// Helper harness for spinning up the application against a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    auth_service: Arc<AuthService>,
    token: String,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with a fresh, migrated database.
    pub async fn new() -> Self {
        let db_dir = TempDir::new().expect("temp dir for test database");
        let db_path = db_dir.path().join("backoffice_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let token = auth_service
            .issue_token(
                "test-admin",
                Some("Test Admin".to_string()),
                vec![ADMIN_ROLE.to_string()],
                Vec::new(),
            )
            .expect("issue admin token");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = backoffice_api::app_router(state.clone(), auth_service.clone());

        Self {
            router,
            state,
            auth_service,
            token,
            _db_dir: db_dir,
        }
    }

    /// A clone of the router for hand-built requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bearer token for the default admin operator.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Token for a non-admin operator holding exactly `permissions`.
    pub fn token_with(&self, permissions: &[&str]) -> String {
        self.auth_service
            .issue_token(
                "test-operator",
                None,
                Vec::new(),
                permissions.iter().map(|p| p.to_string()).collect(),
            )
            .expect("issue scoped token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Authenticated request that must answer `expected`; returns the JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Value {
        let response = self.request_authenticated(method.clone(), uri, body).await;
        let status = response.status();
        let json = response_json(response).await;
        assert_eq!(status, expected, "{method} {uri} answered {json}");
        json
    }

    pub async fn post(&self, uri: &str, body: Value) -> Value {
        self.send(Method::POST, uri, Some(body), StatusCode::CREATED)
            .await
    }

    pub async fn get(&self, uri: &str) -> Value {
        self.send(Method::GET, uri, None, StatusCode::OK).await
    }

    /// Seed a warehouse, a product and one of its variants; returns their slugs.
    pub async fn seed_catalog(&self) -> Seeded {
        let warehouse = self
            .post(
                "/api/v1/warehouses",
                serde_json::json!({"name": "Central", "city": "Austin", "country": "US"}),
            )
            .await;
        let product = self
            .post(
                "/api/v1/products",
                serde_json::json!({"name": "Widget", "sku": "WID-1"}),
            )
            .await;
        let variant = self
            .post(
                "/api/v1/variants",
                serde_json::json!({
                    "product_slug": product["slug"],
                    "sku": "WID-1-L",
                    "name": "Large",
                    "price": "12.50"
                }),
            )
            .await;

        Seeded {
            warehouse: slug_of(&warehouse),
            product: slug_of(&product),
            variant: slug_of(&variant),
        }
    }
}

pub struct Seeded {
    pub warehouse: String,
    pub product: String,
    pub variant: String,
}

pub fn slug_of(value: &Value) -> String {
    value["slug"].as_str().expect("slug in response").to_string()
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json response")
    }
}
