use super::{ApiJson, AppState};
use crate::{
    auth::{AccessGate, AuthRouterExt, AuthUser},
    entities::order_item,
    errors::ServiceError,
    models::OrderDetails,
    services::orders::CreateOrderRequest,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use std::sync::Arc;

/// Order routes; every one of them requires a bearer token
pub fn order_routes(gate: Arc<dyn AccessGate>) -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/allitems", get(list_order_items))
        .route("/:id", get(get_order).delete(delete_order))
        .with_auth(gate)
}

/// List every order with its lines
#[utoipa::path(
    get,
    path = "/api/order",
    responses(
        (status = 200, description = "Orders returned", body = [OrderDetails]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "No orders exist", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderDetails>>, ServiceError> {
    let orders = state.services.orders.list_orders().await?;
    if orders.is_empty() {
        return Err(ServiceError::NotFound("No orders found.".to_string()));
    }
    Ok(Json(orders))
}

/// List every order line across all orders
#[utoipa::path(
    get,
    path = "/api/order/allitems",
    responses(
        (status = 200, description = "Order lines returned", body = [order_item::Model]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "No order lines exist", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_order_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<order_item::Model>>, ServiceError> {
    let lines = state.services.orders.list_order_items().await?;
    if lines.is_empty() {
        return Err(ServiceError::NotFound("No order items found.".to_string()));
    }
    Ok(Json(lines))
}

/// Get a single order
#[utoipa::path(
    get,
    path = "/api/order/{id}",
    params(
        ("id" = i32, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order returned", body = OrderDetails),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<OrderDetails>, ServiceError> {
    state
        .services
        .orders
        .get_order(id)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::not_found("Order", id))
}

/// Place an order, reserving stock for every line
#[utoipa::path(
    post,
    path = "/api/order",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderDetails,
            headers(("x-request-id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Referenced inventory item not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.create_order(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Delete an order. Stock reserved by it is not returned.
#[utoipa::path(
    delete,
    path = "/api/order/{id}",
    params(
        ("id" = i32, Path, description = "Order ID")
    ),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.services.orders.delete_order(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
