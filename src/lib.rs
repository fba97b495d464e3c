//! LogiTrack API Library
//!
//! Inventory ledger, order assembly with atomic stock reservation, a read
//! cache for order listings, and bearer-token access control, exposed over
//! an axum HTTP surface.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod seed;
pub mod services;
pub mod tracing;
pub mod validation;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::db::DbPool;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Builds the service layer over an already migrated store
    pub fn new(db: Arc<DbPool>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

/// Routes mounted under `/api`
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/inventory", handlers::inventory::inventory_routes())
        .nest(
            "/order",
            handlers::orders::order_routes(state.services.access_gate()),
        )
        .nest("/auth", handlers::auth::auth_routes())
}

/// Full application router: API, health, Swagger UI, request ids and
/// HTTP tracing. CORS is left to the caller.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api_routes(&state))
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(TraceLayer::new_for_http().make_span_with(crate::tracing::RequestSpanMaker))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
