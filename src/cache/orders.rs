use super::{CacheBackend, CacheError};
use crate::models::OrderDetails;
use metrics::counter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Cache key holding every order with its lines and item snapshots
pub const ALL_ORDERS_KEY: &str = "orders:all";

/// Read-through cache for the "all orders" collection.
///
/// Writers call [`invalidate`](Self::invalidate) after their transaction
/// commits. Readers take a [`generation`](Self::generation) ticket before
/// loading from the store and hand it back to
/// [`populate`](Self::populate); a ticket issued before the most recent
/// invalidation is refused, so a slow read can never put pre-write data
/// back into the cache.
pub struct OrderReadCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    generation: AtomicU64,
    // serialises populate-vs-invalidate
    gate: Mutex<()>,
}

impl OrderReadCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            generation: AtomicU64::new(0),
            gate: Mutex::new(()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns the cached collection, or `None` on a miss. Backend and
    /// decoding failures are logged and reported as misses.
    pub async fn get_all(&self) -> Option<Vec<OrderDetails>> {
        match self.read().await {
            Ok(Some(orders)) => {
                counter!("logitrack_order_cache_hits_total", 1);
                debug!(count = orders.len(), "Order cache hit");
                Some(orders)
            }
            Ok(None) => {
                counter!("logitrack_order_cache_misses_total", 1);
                debug!("Order cache miss");
                None
            }
            Err(e) => {
                counter!("logitrack_order_cache_misses_total", 1);
                warn!(error = %e, "Order cache read failed; falling back to store");
                if let Err(e) = self.backend.delete(ALL_ORDERS_KEY).await {
                    warn!(error = %e, "Failed to drop unreadable order cache entry");
                }
                None
            }
        }
    }

    async fn read(&self) -> Result<Option<Vec<OrderDetails>>, CacheError> {
        match self.backend.get(ALL_ORDERS_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Stores `orders` if no invalidation happened since `ticket` was taken.
    /// Returns whether the collection was stored.
    pub async fn populate(&self, ticket: u64, orders: &[OrderDetails]) -> bool {
        let payload = match serde_json::to_string(orders) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to encode orders for caching");
                return false;
            }
        };

        let _gate = self.gate.lock().await;
        if self.generation() != ticket {
            debug!(ticket, current = self.generation(), "Skipping stale order cache fill");
            return false;
        }

        match self
            .backend
            .set(ALL_ORDERS_KEY, &payload, Some(self.ttl))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to populate order cache");
                false
            }
        }
    }

    /// Evicts the cached collection and retires every outstanding ticket.
    pub async fn invalidate(&self) {
        let _gate = self.gate.lock().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        counter!("logitrack_order_cache_invalidations_total", 1);
        if let Err(e) = self.backend.delete(ALL_ORDERS_KEY).await {
            // the generation bump still blocks stale fills; the entry ages out by TTL
            warn!(error = %e, "Failed to evict order cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryCache, NoopCache};
    use chrono::Utc;

    fn order(id: i32) -> OrderDetails {
        OrderDetails {
            id,
            customer_name: "Acme Corp".into(),
            date_placed: Utc::now(),
            items: Vec::new(),
        }
    }

    fn cache(ttl: Duration) -> OrderReadCache {
        OrderReadCache::new(Arc::new(InMemoryCache::new()), ttl)
    }

    #[tokio::test]
    async fn populate_then_hit() {
        let cache = cache(Duration::from_secs(900));
        assert!(cache.get_all().await.is_none());

        let orders = vec![order(1), order(2)];
        let ticket = cache.generation();
        assert!(cache.populate(ticket, &orders).await);

        assert_eq!(cache.get_all().await, Some(orders));
    }

    #[tokio::test]
    async fn invalidate_evicts_collection() {
        let cache = cache(Duration::from_secs(900));
        let ticket = cache.generation();
        cache.populate(ticket, &[order(1)]).await;

        cache.invalidate().await;
        assert!(cache.get_all().await.is_none());
    }

    #[tokio::test]
    async fn fill_started_before_invalidation_is_refused() {
        let cache = cache(Duration::from_secs(900));

        // reader takes its ticket, then a writer commits and invalidates
        let stale_ticket = cache.generation();
        cache.invalidate().await;

        assert!(!cache.populate(stale_ticket, &[order(1)]).await);
        assert!(cache.get_all().await.is_none());

        let fresh_ticket = cache.generation();
        assert!(cache.populate(fresh_ticket, &[order(1), order(2)]).await);
        assert_eq!(cache.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn collection_expires_after_ttl() {
        let cache = cache(Duration::from_secs(900));
        let ticket = cache.generation();
        cache.populate(ticket, &[order(1)]).await;

        tokio::time::advance(Duration::from_secs(899)).await;
        assert!(cache.get_all().await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get_all().await.is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_is_treated_as_miss_and_dropped() {
        let backend = Arc::new(InMemoryCache::new());
        backend.set(ALL_ORDERS_KEY, "not json", None).await.unwrap();
        let cache = OrderReadCache::new(backend.clone(), Duration::from_secs(60));

        assert!(cache.get_all().await.is_none());
        assert!(!backend.exists(ALL_ORDERS_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn disabled_backend_always_misses() {
        let cache = OrderReadCache::new(Arc::new(NoopCache), Duration::from_secs(60));
        let ticket = cache.generation();
        cache.populate(ticket, &[order(1)]).await;
        assert!(cache.get_all().await.is_none());
    }
}
