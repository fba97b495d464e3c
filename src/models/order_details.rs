use crate::entities::{inventory_item, order, order_item};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Point-in-time view of an inventory item as embedded in order reads
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub id: i32,
    pub name: String,
    pub quantity: i32,
}

impl From<&inventory_item::Model> for ItemSnapshot {
    fn from(item: &inventory_item::Model) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            quantity: item.quantity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: i32,
    pub order_id: i32,
    pub inventory_item_id: i32,
    pub quantity: i32,
    /// `None` only if the referenced item could not be resolved
    pub inventory_item: Option<ItemSnapshot>,
}

/// An order with its lines and the inventory they reference, eagerly loaded
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub id: i32,
    pub customer_name: String,
    pub date_placed: DateTime<Utc>,
    pub items: Vec<OrderLine>,
}

impl OrderDetails {
    pub fn assemble(
        order: order::Model,
        lines: Vec<order_item::Model>,
        items: &HashMap<i32, ItemSnapshot>,
    ) -> Self {
        let items = lines
            .into_iter()
            .map(|line| OrderLine {
                id: line.id,
                order_id: line.order_id,
                inventory_item_id: line.inventory_item_id,
                quantity: line.quantity,
                inventory_item: items.get(&line.inventory_item_id).cloned(),
            })
            .collect();

        Self {
            id: order.id,
            customer_name: order.customer_name,
            date_placed: order.date_placed,
            items,
        }
    }

    pub fn total_quantity(&self) -> i32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// One-line description used in logs and seeding output.
    pub fn summary(&self) -> String {
        let names: Vec<&str> = self
            .items
            .iter()
            .filter_map(|line| line.inventory_item.as_ref())
            .map(|item| item.name.as_str())
            .take(3)
            .collect();
        let mut products = names.join(", ");
        if self.items.len() > 3 {
            products.push_str("...");
        }

        format!(
            "Order #{} | Customer: {} | Items: {} (Qty: {}) | Products: {} | Placed: {}",
            self.id,
            self.customer_name,
            self.items.len(),
            self.total_quantity(),
            products,
            self.date_placed.format("%-m/%-d/%Y")
        )
    }
}
