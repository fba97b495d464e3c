use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LogiTrack API",
        version = "0.1.0",
        description = r#"
# LogiTrack Warehouse API

Inventory and order management for a single warehouse.

## Features

- **Inventory**: create, update and remove stock records
- **Orders**: place multi-line orders that reserve stock atomically
- **Accounts**: register and log in to obtain a bearer token

## Authentication

Order endpoints require a JWT obtained from `POST /api/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Failures share one body shape:

```json
{
  "error": "Bad Request",
  "message": "Insufficient quantity for item Pallet Jack. Available: 12, Requested: 15",
  "request_id": "0b9d6c3e-1f0e-4a53-9a51-3f1c0c1f2b7e",
  "timestamp": "2026-01-01T00:00:00+00:00"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "inventory", description = "Inventory management endpoints"),
        (name = "orders", description = "Order management endpoints"),
        (name = "auth", description = "Registration and login"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Inventory
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::get_inventory,
        crate::handlers::inventory::create_inventory,
        crate::handlers::inventory::update_inventory,
        crate::handlers::inventory::delete_inventory,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::list_order_items,
        crate::handlers::orders::get_order,
        crate::handlers::orders::create_order,
        crate::handlers::orders::delete_order,

        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            // Inventory types
            crate::entities::inventory_item::Model,
            crate::services::inventory::CreateInventoryItemRequest,
            crate::services::inventory::UpdateInventoryItemRequest,

            // Order types
            crate::models::OrderDetails,
            crate::models::OrderLine,
            crate::models::ItemSnapshot,
            crate::entities::order_item::Model,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::OrderLineRequest,

            // Auth types
            crate::auth::RegisterRequest,
            crate::auth::LoginRequest,
            crate::auth::TokenResponse,
            crate::handlers::auth::MessageResponse,

            crate::handlers::health::HealthResponse,
            crate::handlers::health::ComponentStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the order endpoints
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
