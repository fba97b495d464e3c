//! Retries for units of work that lose a race for the store's write lock.

use crate::errors::ServiceError;
use metrics::counter;
use sea_orm::{sqlx, DbErr, RuntimeErr};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Factor to multiply delay by after each attempt
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
        }
    }
}

/// Decides whether a failed attempt is worth repeating
pub trait RetryPolicy<E> {
    fn is_retryable(&self, error: &E) -> bool;
}

/// Retries store errors caused by lock contention: SQLite `BUSY`/`LOCKED`
/// and Postgres serialization failures or deadlocks. Business-rule
/// rejections are never retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreContentionPolicy;

impl RetryPolicy<ServiceError> for StoreContentionPolicy {
    fn is_retryable(&self, error: &ServiceError) -> bool {
        matches!(error, ServiceError::DatabaseError(err) if is_lock_contention(err))
    }
}

pub fn is_lock_contention(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return false,
    };
    let RuntimeErr::SqlxError(sqlx::Error::Database(db_err)) = runtime else {
        return false;
    };
    let Some(code) = db_err.code() else {
        return false;
    };

    match &*code {
        "40001" | "40P01" => true,
        // SQLite reports extended codes; the low byte is the primary code
        other => other
            .parse::<i32>()
            .map(|code| matches!(code & 0xff, 5 | 6))
            .unwrap_or(false),
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error,
/// or runs out of attempts.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    policy: impl RetryPolicy<E>,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!(attempts, "Operation succeeded after retrying");
                }
                return Ok(result);
            }
            Err(error) => {
                if !policy.is_retryable(&error) {
                    return Err(error);
                }
                if attempts >= config.max_attempts {
                    warn!(attempts, error = %error, "Giving up after repeated store contention");
                    return Err(error);
                }

                counter!("logitrack_db_retries_total", 1);
                debug!(attempt = attempts, error = %error, ?delay, "Store busy, retrying");
                sleep(delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_factor)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct RetryEverything;

    impl RetryPolicy<ServiceError> for RetryEverything {
        fn is_retryable(&self, _: &ServiceError) -> bool {
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_once_contention_clears() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryConfig::default(), RetryEverything, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ServiceError::InternalError("busy".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_max_attempts() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 3,
            ..Default::default()
        };
        let result: Result<(), _> = with_retry(&config, RetryEverything, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::InternalError("busy".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn business_rejections_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> =
            with_retry(&RetryConfig::default(), StoreContentionPolicy, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::InsufficientStock {
                    item_id: 1,
                    item_name: "Pallet Jack".into(),
                    available: 0,
                    requested: 1,
                })
            })
            .await;

        assert!(matches!(result, Err(ServiceError::InsufficientStock { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_lock_errors_are_not_contention() {
        assert!(!is_lock_contention(&DbErr::RecordNotFound("x".into())));
        assert!(!is_lock_contention(&DbErr::Exec(RuntimeErr::Internal(
            "syntax".into()
        ))));
    }
}
