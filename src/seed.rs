//! Demo data for a fresh store.

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppServices,
    services::{
        inventory::CreateInventoryItemRequest,
        orders::{CreateOrderRequest, OrderLineRequest},
    },
};
use tracing::info;

/// Seeds one item and one order through the regular services. Does nothing
/// when any inventory already exists. Returns whether data was written.
pub async fn seed_demo_data(services: &AppServices) -> Result<bool, ServiceError> {
    if !services.inventory.list_items().await?.is_empty() {
        info!("Store already holds inventory, skipping demo seed");
        return Ok(false);
    }

    let item = services
        .inventory
        .create_item(CreateInventoryItemRequest {
            name: "Pallet Jack".to_string(),
            quantity: 12,
            location: Some("Warehouse A".to_string()),
        })
        .await?;
    info!("{}", item.display_info());

    let seeder = AuthUser {
        user_id: "0".to_string(),
        username: "seed".to_string(),
        roles: vec!["System".to_string()],
        token_id: String::new(),
    };
    services
        .orders
        .create_order(
            &seeder,
            CreateOrderRequest {
                customer_name: "Acme Corp".to_string(),
                order_date: None,
                items: vec![OrderLineRequest {
                    item_id: item.id,
                    quantity: 2,
                }],
            },
        )
        .await?;

    for order in services.orders.list_orders().await? {
        info!("{}", order.summary());
    }
    Ok(true)
}
