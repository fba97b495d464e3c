use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stock record for one warehouse item
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "inventory_items")]
#[serde(rename_all = "camelCase")]
#[schema(as = InventoryItem)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Quantity on hand, never negative
    pub quantity: i32,
    pub location: Option<String>,
}

impl Model {
    pub fn display_info(&self) -> String {
        format!(
            "Item: {} | Quantity: {} | Location: {}",
            self.name,
            self.quantity,
            self.location.as_deref().unwrap_or("-")
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
