pub mod auth;
pub mod health;
pub mod inventory;
pub mod orders;

use crate::{
    auth::{AccessGate, AuthConfig, AuthService},
    cache::{CacheFactory, OrderReadCache},
    config::AppConfig,
    db::DbPool,
    errors::ServiceError,
    services::{inventory::InventoryService, orders::OrderService},
};
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub inventory: Arc<InventoryService>,
    pub orders: Arc<OrderService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    /// Wires the ledger, the assembler and the credential issuer around one
    /// shared order read cache.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let backend = CacheFactory::create_backend(&config.cache);
        let order_cache = Arc::new(OrderReadCache::new(
            backend,
            Duration::from_secs(config.cache.order_ttl_secs),
        ));

        let inventory = Arc::new(InventoryService::new(db_pool.clone(), order_cache.clone()));
        let orders = Arc::new(OrderService::new(db_pool.clone(), order_cache));
        let auth = Arc::new(AuthService::new(AuthConfig::from(config), db_pool));

        Self {
            inventory,
            orders,
            auth,
        }
    }

    /// The gate guarding authenticated routes
    pub fn access_gate(&self) -> Arc<dyn AccessGate> {
        self.auth.clone()
    }
}

/// JSON body whose rejections surface as `400 InvalidRequest` in the
/// standard error shape
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::InvalidRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// [`ApiJson`] that also runs the payload's `validator` rules
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}
