//! Unit-of-work helper: run a closure inside one database transaction.

use crate::errors::ServiceError;
use metrics::counter;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction.
///
/// The transaction commits when the closure returns `Ok` and rolls back on
/// any `Err`. Errors produced by the closure come back unchanged, so a
/// business-rule rejection keeps its variant; failures to begin or commit
/// surface as [`ServiceError::DatabaseError`].
///
/// ```rust,ignore
/// let order = with_transaction(&db, |txn| {
///     Box::pin(async move {
///         InventoryService::reserve(txn, item_id, 2).await?;
///         order.insert(txn).await.map_err(ServiceError::from)
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T>(db: &DatabaseConnection, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let result = db.transaction::<F, T, ServiceError>(f).await;

    match result {
        Ok(value) => {
            counter!("logitrack_db_transactions_committed_total", 1);
            debug!("Transaction committed");
            Ok(value)
        }
        Err(TransactionError::Connection(db_err)) => {
            counter!("logitrack_db_transactions_failed_total", 1);
            warn!(error = %db_err, "Transaction failed at the connection level");
            Err(ServiceError::DatabaseError(db_err))
        }
        Err(TransactionError::Transaction(err)) => {
            counter!("logitrack_db_transactions_rolled_back_total", 1);
            debug!(error = %err, "Transaction rolled back");
            Err(err)
        }
    }
}
