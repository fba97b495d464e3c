use crate::{
    cache::OrderReadCache,
    db::{with_retry, with_transaction, DbPool, RetryConfig, StoreContentionPolicy},
    entities::{inventory_item, order_item},
    errors::ServiceError,
    models::ItemSnapshot,
    validation::validate_display_name,
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryItemRequest {
    #[validate(custom = "validate_display_name")]
    #[schema(example = "Pallet Jack")]
    pub name: String,
    #[validate(range(min = 0))]
    #[schema(example = 12)]
    pub quantity: i32,
    #[validate(length(max = 100))]
    #[schema(example = "Warehouse A")]
    pub location: Option<String>,
}

/// Full replacement of an item's mutable fields; `id` must match the path
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryItemRequest {
    pub id: i32,
    #[validate(custom = "validate_display_name")]
    pub name: String,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[validate(length(max = 100))]
    pub location: Option<String>,
}

/// The inventory ledger: item CRUD plus the atomic reservation primitive
/// used by order assembly.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
    order_cache: Arc<OrderReadCache>,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>, order_cache: Arc<OrderReadCache>) -> Self {
        Self { db, order_cache }
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        let items = inventory_item::Entity::find()
            .order_by_asc(inventory_item::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, id: i32) -> Result<inventory_item::Model, ServiceError> {
        inventory_item::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Inventory item", id))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_item(
        &self,
        request: CreateInventoryItemRequest,
    ) -> Result<inventory_item::Model, ServiceError> {
        request.validate()?;

        let item = inventory_item::ActiveModel {
            name: Set(request.name),
            quantity: Set(request.quantity),
            location: Set(request.location),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(item_id = item.id, quantity = item.quantity, "Inventory item created");
        Ok(item)
    }

    #[instrument(skip(self, request))]
    pub async fn update_item(
        &self,
        id: i32,
        request: UpdateInventoryItemRequest,
    ) -> Result<inventory_item::Model, ServiceError> {
        if request.id != id {
            return Err(ServiceError::InvalidRequest(format!(
                "Item ID mismatch: path has {}, body has {}",
                id, request.id
            )));
        }
        request.validate()?;

        let existing = self.get_item(id).await?;
        let mut item: inventory_item::ActiveModel = existing.into();
        item.name = Set(request.name);
        item.quantity = Set(request.quantity);
        item.location = Set(request.location);
        let updated = item.update(&*self.db).await?;

        // cached orders embed item snapshots
        self.order_cache.invalidate().await;
        info!(item_id = id, quantity = updated.quantity, "Inventory item updated");
        Ok(updated)
    }

    /// Deletes an item. Items still referenced by order lines are kept and
    /// the call fails with `Conflict`.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: i32) -> Result<(), ServiceError> {
        let result = with_retry(&RetryConfig::default(), StoreContentionPolicy, || {
            with_transaction(&self.db, move |txn| {
                Box::pin(async move {
                    Self::lock_items(txn, &[id]).await?;
                    if inventory_item::Entity::find_by_id(id).one(txn).await?.is_none() {
                        return Err(ServiceError::not_found("Inventory item", id));
                    }

                    let references = order_item::Entity::find()
                        .filter(order_item::Column::InventoryItemId.eq(id))
                        .count(txn)
                        .await?;
                    if references > 0 {
                        return Err(referenced_item_conflict(id));
                    }

                    inventory_item::Entity::delete_by_id(id).exec(txn).await?;
                    Ok(())
                })
            })
        })
        .await;

        match result {
            Ok(()) => {
                self.order_cache.invalidate().await;
                info!(item_id = id, "Inventory item deleted");
                Ok(())
            }
            // an order line committed between the check and the delete
            Err(ServiceError::DatabaseError(err))
                if matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) =>
            {
                warn!(item_id = id, "Delete blocked by foreign key");
                Err(referenced_item_conflict(id))
            }
            Err(err) => Err(err),
        }
    }

    /// Claims the given items for the current unit of work with a no-op
    /// update. On SQLite this takes the write lock before anything is read,
    /// so the transaction never has to upgrade a read lock mid-way; on
    /// Postgres it row-locks the items.
    pub async fn lock_items<C: ConnectionTrait>(
        conn: &C,
        item_ids: &[i32],
    ) -> Result<(), ServiceError> {
        inventory_item::Entity::update_many()
            .col_expr(
                inventory_item::Column::Quantity,
                Expr::col(inventory_item::Column::Quantity).into(),
            )
            .filter(inventory_item::Column::Id.is_in(item_ids.iter().copied()))
            .exec(conn)
            .await?;
        Ok(())
    }

    /// Resolves a batch of item ids in one query. Missing ids are simply
    /// absent from the returned map.
    pub async fn lookup_many<C: ConnectionTrait>(
        conn: &C,
        item_ids: &[i32],
    ) -> Result<HashMap<i32, ItemSnapshot>, ServiceError> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let items = inventory_item::Entity::find()
            .filter(inventory_item::Column::Id.is_in(item_ids.iter().copied()))
            .all(conn)
            .await?;

        Ok(items
            .iter()
            .map(|item| (item.id, ItemSnapshot::from(item)))
            .collect())
    }

    /// Takes `quantity` units of an item in a single conditional update, so
    /// concurrent reservations can never drive the stock below zero.
    /// Returns the item as it stands after the decrement.
    pub async fn reserve<C: ConnectionTrait>(
        conn: &C,
        item_id: i32,
        quantity: i32,
    ) -> Result<ItemSnapshot, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidRequest(format!(
                "Quantity for item {} must be greater than zero",
                item_id
            )));
        }

        let updated = inventory_item::Entity::update_many()
            .col_expr(
                inventory_item::Column::Quantity,
                Expr::col(inventory_item::Column::Quantity).sub(quantity),
            )
            .filter(inventory_item::Column::Id.eq(item_id))
            .filter(inventory_item::Column::Quantity.gte(quantity))
            .exec(conn)
            .await?;

        let item = inventory_item::Entity::find_by_id(item_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Inventory item", item_id))?;

        if updated.rows_affected == 0 {
            return Err(ServiceError::InsufficientStock {
                item_id,
                item_name: item.name,
                available: item.quantity,
                requested: quantity,
            });
        }

        Ok(ItemSnapshot::from(&item))
    }
}

fn referenced_item_conflict(id: i32) -> ServiceError {
    ServiceError::Conflict(format!(
        "Inventory item with ID {} is referenced by existing orders and cannot be deleted.",
        id
    ))
}
