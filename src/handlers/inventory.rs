use super::{AppState, ValidatedJson};
use crate::{
    entities::inventory_item,
    errors::ServiceError,
    services::inventory::{CreateInventoryItemRequest, UpdateInventoryItemRequest},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

/// Create the inventory router
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory).post(create_inventory))
        .route(
            "/:id",
            get(get_inventory)
                .put(update_inventory)
                .delete(delete_inventory),
        )
}

/// List every inventory item
#[utoipa::path(
    get,
    path = "/api/inventory",
    responses(
        (status = 200, description = "Inventory list returned", body = [inventory_item::Model],
            headers(("x-request-id" = String, description = "Unique request id for tracing"))
        ),
        (status = 404, description = "No inventory items exist", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
) -> Result<Json<Vec<inventory_item::Model>>, ServiceError> {
    let items = state.services.inventory.list_items().await?;
    if items.is_empty() {
        return Err(ServiceError::NotFound(
            "No inventory items found.".to_string(),
        ));
    }
    Ok(Json(items))
}

/// Get a single inventory item
#[utoipa::path(
    get,
    path = "/api/inventory/{id}",
    params(
        ("id" = i32, Path, description = "Inventory item ID")
    ),
    responses(
        (status = 200, description = "Inventory item returned", body = inventory_item::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<inventory_item::Model>, ServiceError> {
    let item = state.services.inventory.get_item(id).await?;
    Ok(Json(item))
}

/// Create an inventory item
#[utoipa::path(
    post,
    path = "/api/inventory",
    request_body = CreateInventoryItemRequest,
    responses(
        (status = 201, description = "Inventory item created", body = inventory_item::Model,
            headers(("x-request-id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_inventory(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateInventoryItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.inventory.create_item(payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Replace an item's name, quantity and location
#[utoipa::path(
    put,
    path = "/api/inventory/{id}",
    params(
        ("id" = i32, Path, description = "Inventory item ID")
    ),
    request_body = UpdateInventoryItemRequest,
    responses(
        (status = 200, description = "Inventory item updated", body = inventory_item::Model),
        (status = 400, description = "Invalid request or ID mismatch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateInventoryItemRequest>,
) -> Result<Json<inventory_item::Model>, ServiceError> {
    let item = state.services.inventory.update_item(id, payload).await?;
    Ok(Json(item))
}

/// Delete an inventory item
#[utoipa::path(
    delete,
    path = "/api/inventory/{id}",
    params(
        ("id" = i32, Path, description = "Inventory item ID")
    ),
    responses(
        (status = 204, description = "Inventory item deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item is referenced by existing orders", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.services.inventory.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
