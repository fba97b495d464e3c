use super::AppState;
use crate::db::check_connection;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub database: ComponentStatus,
    pub version: String,
}

/// Liveness plus a store ping
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and store are up", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, code, database) = match check_connection(&state.db).await {
        Ok(()) => ("ok", StatusCode::OK, ComponentStatus::Up),
        Err(e) => {
            warn!(error = %e, "Health check: database unreachable");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, ComponentStatus::Down)
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            database,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
