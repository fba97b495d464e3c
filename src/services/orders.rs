use crate::{
    auth::AuthUser,
    cache::OrderReadCache,
    db::{with_retry, with_transaction, DbPool, RetryConfig, StoreContentionPolicy},
    entities::{order, order_item},
    errors::ServiceError,
    models::{ItemSnapshot, OrderDetails},
    services::inventory::InventoryService,
    tracing::spawn_in_request_context,
    validation::validate_display_name,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(custom = "validate_display_name")]
    #[schema(example = "Acme Corp")]
    pub customer_name: String,
    /// Defaults to the time the order is accepted
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    #[schema(example = 1)]
    pub item_id: i32,
    #[schema(example = 2)]
    pub quantity: i32,
}

fn validate_lines(lines: &[OrderLineRequest]) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::InvalidRequest(
            "An order must contain at least one item.".to_string(),
        ));
    }
    if let Some(line) = lines.iter().find(|line| line.quantity <= 0) {
        return Err(ServiceError::InvalidRequest(format!(
            "Quantity for item {} must be greater than zero.",
            line.item_id
        )));
    }
    Ok(())
}

/// Assembles orders against the inventory ledger and serves order reads
/// through the read cache.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    cache: Arc<OrderReadCache>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, cache: Arc<OrderReadCache>) -> Self {
        Self { db, cache }
    }

    /// Creates an order, reserving stock for every line. Either every line
    /// is reserved and the order persisted, or nothing changes.
    ///
    /// The unit of work runs on its own task so a caller that goes away
    /// mid-request cannot abandon an open transaction. Attempts that lose a
    /// race for the store's write lock are retried.
    #[instrument(skip(self, actor, request), fields(placed_by = %actor.username, customer = %request.customer_name))]
    pub async fn create_order(
        &self,
        actor: &AuthUser,
        request: CreateOrderRequest,
    ) -> Result<OrderDetails, ServiceError> {
        validate_lines(&request.items)?;
        request.validate()?;

        let service = self.clone();
        let placed_by = actor.username.clone();
        spawn_in_request_context(async move { service.commit_order(placed_by, request).await })
            .await
            .map_err(|e| ServiceError::InternalError(format!("Order creation task failed: {}", e)))?
    }

    async fn commit_order(
        &self,
        placed_by: String,
        request: CreateOrderRequest,
    ) -> Result<OrderDetails, ServiceError> {
        let customer = request.customer_name.clone();
        let result = with_retry(&RetryConfig::default(), StoreContentionPolicy, || {
            let request = request.clone();
            with_transaction(&self.db, move |txn| Box::pin(assemble_order(txn, request)))
        })
        .await;

        match result {
            Ok(order) => {
                self.cache.invalidate().await;
                counter!("logitrack_orders_created_total", 1);
                info!(
                    order_id = order.id,
                    placed_by = %placed_by,
                    lines = order.items.len(),
                    quantity = order.total_quantity(),
                    "Order created"
                );
                Ok(order)
            }
            Err(err) => {
                counter!("logitrack_orders_rejected_total", 1);
                warn!(customer = %customer, placed_by = %placed_by, error = %err, "Order rejected");
                Err(err)
            }
        }
    }

    /// Removes an order and its lines. Reserved stock is not returned to
    /// inventory.
    #[instrument(skip(self, actor), fields(deleted_by = %actor.username))]
    pub async fn delete_order(&self, actor: &AuthUser, order_id: i32) -> Result<(), ServiceError> {
        let service = self.clone();
        let deleted_by = actor.username.clone();
        spawn_in_request_context(async move { service.remove_order(deleted_by, order_id).await })
            .await
            .map_err(|e| ServiceError::InternalError(format!("Order deletion task failed: {}", e)))?
    }

    async fn remove_order(&self, deleted_by: String, order_id: i32) -> Result<(), ServiceError> {
        let lines_removed = with_retry(&RetryConfig::default(), StoreContentionPolicy, || {
            with_transaction(&self.db, move |txn| {
                Box::pin(async move {
                    // writes only, so the transaction starts on the write lock
                    let lines = order_item::Entity::delete_many()
                        .filter(order_item::Column::OrderId.eq(order_id))
                        .exec(txn)
                        .await?;
                    let removed = order::Entity::delete_by_id(order_id).exec(txn).await?;
                    if removed.rows_affected == 0 {
                        return Err(ServiceError::not_found("Order", order_id));
                    }
                    Ok(lines.rows_affected)
                })
            })
        })
        .await?;

        self.cache.invalidate().await;
        info!(order_id, deleted_by = %deleted_by, lines_removed, "Order deleted");
        Ok(())
    }

    /// Every order with lines and item snapshots, served from the cache
    /// when present.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderDetails>, ServiceError> {
        if let Some(orders) = self.cache.get_all().await {
            return Ok(orders);
        }

        let ticket = self.cache.generation();
        let orders = load_all_orders(&*self.db).await?;
        self.cache.populate(ticket, &orders).await;
        Ok(orders)
    }

    /// Filters the cached collection when one is present, otherwise reads
    /// the single order from the store.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<Option<OrderDetails>, ServiceError> {
        if let Some(orders) = self.cache.get_all().await {
            return Ok(orders.into_iter().find(|o| o.id == order_id));
        }
        load_order(&*self.db, order_id).await
    }

    /// All order lines across orders, uncached
    #[instrument(skip(self))]
    pub async fn list_order_items(&self) -> Result<Vec<order_item::Model>, ServiceError> {
        let lines = order_item::Entity::find()
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(lines)
    }
}

async fn assemble_order(
    txn: &DatabaseTransaction,
    request: CreateOrderRequest,
) -> Result<OrderDetails, ServiceError> {
    let mut item_ids: Vec<i32> = request.items.iter().map(|line| line.item_id).collect();
    item_ids.sort_unstable();
    item_ids.dedup();

    InventoryService::lock_items(txn, &item_ids).await?;
    let available = InventoryService::lookup_many(txn, &item_ids).await?;
    if let Some(missing) = request
        .items
        .iter()
        .find(|line| !available.contains_key(&line.item_id))
    {
        return Err(ServiceError::not_found("Inventory item", missing.item_id));
    }

    // lines for the same item draw from one running balance
    let mut remaining: HashMap<i32, i32> = available
        .iter()
        .map(|(id, item)| (*id, item.quantity))
        .collect();
    for line in &request.items {
        let left = remaining.entry(line.item_id).or_insert(0);
        if line.quantity > *left {
            return Err(ServiceError::InsufficientStock {
                item_id: line.item_id,
                item_name: available
                    .get(&line.item_id)
                    .map(|item| item.name.clone())
                    .unwrap_or_default(),
                available: *left,
                requested: line.quantity,
            });
        }
        *left -= line.quantity;
    }

    let mut snapshots: HashMap<i32, ItemSnapshot> = HashMap::with_capacity(item_ids.len());
    for line in &request.items {
        let snapshot = InventoryService::reserve(txn, line.item_id, line.quantity).await?;
        snapshots.insert(line.item_id, snapshot);
    }

    let order = order::ActiveModel {
        customer_name: Set(request.customer_name),
        date_placed: Set(request.order_date.unwrap_or_else(Utc::now)),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let mut lines = Vec::with_capacity(request.items.len());
    for line in request.items {
        let stored = order_item::ActiveModel {
            order_id: Set(order.id),
            inventory_item_id: Set(line.item_id),
            quantity: Set(line.quantity),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        lines.push(stored);
    }

    Ok(OrderDetails::assemble(order, lines, &snapshots))
}

async fn load_all_orders<C: ConnectionTrait>(conn: &C) -> Result<Vec<OrderDetails>, ServiceError> {
    let rows = order::Entity::find()
        .find_with_related(order_item::Entity)
        .order_by_asc(order::Column::Id)
        .order_by_asc(order_item::Column::Id)
        .all(conn)
        .await?;

    let mut item_ids: Vec<i32> = rows
        .iter()
        .flat_map(|(_, lines)| lines.iter().map(|line| line.inventory_item_id))
        .collect();
    item_ids.sort_unstable();
    item_ids.dedup();
    let items = InventoryService::lookup_many(conn, &item_ids).await?;

    Ok(rows
        .into_iter()
        .map(|(order, lines)| OrderDetails::assemble(order, lines, &items))
        .collect())
}

async fn load_order<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<Option<OrderDetails>, ServiceError> {
    let Some(order) = order::Entity::find_by_id(order_id).one(conn).await? else {
        return Ok(None);
    };

    let lines = order
        .find_related(order_item::Entity)
        .order_by_asc(order_item::Column::Id)
        .all(conn)
        .await?;
    let item_ids: Vec<i32> = lines.iter().map(|line| line.inventory_item_id).collect();
    let items = InventoryService::lookup_many(conn, &item_ids).await?;

    Ok(Some(OrderDetails::assemble(order, lines, &items)))
}
