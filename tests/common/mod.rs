#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use logitrack_api::{
    auth::{LoginRequest, RegisterRequest},
    config::AppConfig,
    db, AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "k7Qm2vX9pL4rT8wZ1nB6yH3jF5dS0aGc";
pub const TEST_USER: &str = "dock_supervisor";
pub const TEST_PASSWORD: &str = "Forklift_2024";

/// Helper harness for spinning up an application backed by SQLite.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub token: String,
    // keeps a file-backed store alive for the test's duration
    _store_dir: Option<TempDir>,
}

impl TestApp {
    /// Construct a new test application with a fresh in-memory database and
    /// a logged-in user.
    pub async fn new() -> Self {
        // the in-memory database lives exactly as long as its single connection
        Self::with_store("sqlite::memory:".to_string(), 1, None).await
    }

    /// Same as [`TestApp::new`], but on a SQLite file in a temp directory
    /// behind a pool of `connections`, so transactions genuinely overlap.
    pub async fn file_backed(connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("logitrack.db").display());
        Self::with_store(url, connections, Some(dir)).await
    }

    async fn with_store(database_url: String, connections: u32, store_dir: Option<TempDir>) -> Self {
        let mut cfg = AppConfig::new(
            database_url,
            TEST_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = connections;
        cfg.db_min_connections = 1;
        cfg.db_acquire_timeout_secs = 30;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = logitrack_api::build_router(state.clone());

        state
            .services
            .auth
            .register(RegisterRequest {
                username: TEST_USER.to_string(),
                email: "supervisor@logitrack.example".to_string(),
                password: TEST_PASSWORD.to_string(),
                confirm_password: TEST_PASSWORD.to_string(),
            })
            .await
            .expect("failed to register test user");
        let token = state
            .services
            .auth
            .login(LoginRequest {
                username: TEST_USER.to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .expect("failed to log in test user")
            .token;

        Self {
            router,
            state,
            token,
            _store_dir: store_dir,
        }
    }

    /// Sends a request through the router. `token` sets a bearer credential.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Authenticated request as the test user
    pub async fn authed(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(&self.token)).await
    }

    pub async fn create_item(&self, name: &str, quantity: i32) -> Value {
        let response = self
            .request(
                Method::POST,
                "/api/inventory",
                Some(json!({ "name": name, "quantity": quantity, "location": "Warehouse A" })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await
    }

    pub async fn item_quantity(&self, id: i64) -> i64 {
        let response = self
            .request(Method::GET, &format!("/api/inventory/{id}"), None, None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        response_json(response).await["quantity"]
            .as_i64()
            .expect("quantity is numeric")
    }

    pub async fn place_order(&self, customer: &str, lines: &[(i64, i64)]) -> axum::response::Response {
        let items: Vec<Value> = lines
            .iter()
            .map(|(item_id, quantity)| json!({ "itemId": item_id, "quantity": quantity }))
            .collect();
        self.authed(
            Method::POST,
            "/api/order",
            Some(json!({ "customerName": customer, "items": items })),
        )
        .await
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
