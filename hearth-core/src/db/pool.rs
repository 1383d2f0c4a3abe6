//! Connection manager: bounded pool, retried acquisition, health probe
//!
//! Every repository operation obtains its connection through
//! [`ConnectionManager::acquire`], which races each attempt against a fixed
//! timeout and backs off between attempts.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{Connection, PgPool};
use tracing::{debug, error, info, warn};

use crate::config::DatabaseConfig;
use crate::error::{AcquireFailure, ConfigError, ConnectionError};

/// Bounded retry with capped exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based): `min(base * 2^(attempt-1), cap)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// What to do when an idle pooled connection turns out to be broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Log and terminate the process
    Exit,
    /// Log and discard the connection
    Discard,
}

impl FromStr for FaultPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exit" => Ok(Self::Exit),
            "discard" => Ok(Self::Discard),
            other => Err(format!("expected 'exit' or 'discard', got '{}'", other)),
        }
    }
}

/// Run `connect` up to `policy.attempts` times, each bounded by `timeout`.
///
/// A timed-out attempt's future is dropped, which cancels the in-flight
/// acquire instead of leaving it to finish in the background.
pub async fn acquire_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    timeout: Duration,
    mut connect: F,
) -> Result<T, ConnectionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let attempts = policy.attempts.max(1);
    let mut cause = AcquireFailure::Timeout(timeout);

    for attempt in 1..=attempts {
        match tokio::time::timeout(timeout, connect()).await {
            Ok(Ok(conn)) => {
                debug!(attempt, "database connection acquired");
                return Ok(conn);
            }
            Ok(Err(err)) => {
                warn!(attempt, error = %err, "database connection attempt failed");
                cause = AcquireFailure::Driver(err);
            }
            Err(_) => {
                warn!(
                    attempt,
                    timeout_ms = timeout.as_millis() as u64,
                    "database connection attempt timed out"
                );
                cause = AcquireFailure::Timeout(timeout);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
    }

    error!(attempts, error = %cause, "giving up on database connection");
    Err(ConnectionError { attempts, cause })
}

/// Shared handle to the process-wide pool.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    pool: PgPool,
    retry: RetryPolicy,
    acquire_timeout: Duration,
    health_timeout: Duration,
}

impl ConnectionManager {
    /// Build the pool without connecting; connections open on first acquire.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, ConfigError> {
        let options = config.connect_options()?;
        let pool = pool_options(config).connect_lazy_with(options);

        info!(
            max_connections = config.pool_max,
            idle_timeout_secs = config.idle_timeout.as_secs(),
            acquire_timeout_secs = config.connect_timeout.as_secs(),
            attempts = config.retry.attempts,
            "database pool created"
        );

        Ok(Self::from_pool(pool, config))
    }

    /// Wrap an existing pool with the retry settings from `config`.
    pub fn from_pool(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            retry: config.retry,
            acquire_timeout: config.connect_timeout,
            health_timeout: config.health_timeout,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Acquire a live connection, retrying with backoff.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, ConnectionError> {
        acquire_with_retry(&self.retry, self.acquire_timeout, || self.pool.acquire()).await
    }

    /// Liveness probe. Never errors; answers within the health timeout.
    pub async fn test_connection(&self) -> bool {
        let probe = async {
            let mut conn = self.acquire().await.map_err(|e| e.to_string())?;
            sqlx::query_scalar::<_, i32>("SELECT 1")
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| e.to_string())
        };

        match tokio::time::timeout(self.health_timeout, probe).await {
            Ok(Ok(_)) => true,
            Ok(Err(reason)) => {
                warn!(%reason, "database health probe failed");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.health_timeout.as_millis() as u64,
                    "database health probe timed out"
                );
                false
            }
        }
    }

    /// Number of open connections and how many of them are idle.
    pub fn usage(&self) -> (u32, usize) {
        (self.pool.size(), self.pool.num_idle())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}

/// Pool options with the idle-connection fault hook installed.
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    let policy = config.fault_policy;
    PgPoolOptions::new()
        .max_connections(config.pool_max)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.connect_timeout)
        .test_before_acquire(false)
        .before_acquire(move |conn, meta| {
            Box::pin(async move {
                match conn.ping().await {
                    Ok(()) => Ok(true),
                    Err(err) => Ok(on_idle_fault(policy, &err, meta.idle_for)),
                }
            })
        })
}

/// Returns whether the connection may still be used (never, for a fault).
fn on_idle_fault(policy: FaultPolicy, err: &sqlx::Error, idle_for: Duration) -> bool {
    error!(
        error = %err,
        idle_ms = idle_for.as_millis() as u64,
        "idle database connection failed"
    );
    match policy {
        FaultPolicy::Exit => {
            error!("pool state can no longer be trusted, terminating");
            std::process::exit(1);
        }
        FaultPolicy::Discard => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let p = policy();
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(2), Duration::from_secs(2));
        assert_eq!(p.delay_for(3), Duration::from_secs(4));
        assert_eq!(p.delay_for(4), Duration::from_secs(5));
        assert_eq!(p.delay_for(40), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = acquire_with_retry(&policy(), Duration::from_secs(8), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(sqlx::Error::PoolTimedOut)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_connects_time_out_and_exhaust() {
        let calls = AtomicU32::new(0);

        let err = acquire_with_retry(&policy(), Duration::from_secs(8), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, sqlx::Error>(())
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.attempts, 3);
        assert!(matches!(err.cause, AcquireFailure::Timeout(d) if d == Duration::from_secs(8)));
    }

    #[tokio::test(start_paused = true)]
    async fn last_driver_error_is_reported() {
        let err = acquire_with_retry(&policy(), Duration::from_secs(8), || async {
            Err::<(), _>(sqlx::Error::PoolClosed)
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err.cause,
            AcquireFailure::Driver(sqlx::Error::PoolClosed)
        ));
    }

    #[test]
    fn discard_policy_rejects_faulty_connection() {
        assert!(!on_idle_fault(
            FaultPolicy::Discard,
            &sqlx::Error::PoolClosed,
            Duration::from_secs(30)
        ));
    }

    #[tokio::test]
    async fn health_probe_reports_false_when_unreachable() {
        let mut config = crate::config::DatabaseConfig::from_lookup(&|key: &str| match key {
            "DATABASE_URL" => Some("postgres://hearth@127.0.0.1:1/hearth".to_owned()),
            _ => None,
        })
        .unwrap();
        config.retry = RetryPolicy {
            attempts: 2,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
        };
        config.connect_timeout = Duration::from_millis(500);
        config.health_timeout = Duration::from_secs(2);
        config.fault_policy = FaultPolicy::Discard;

        let manager = ConnectionManager::connect_lazy(&config).unwrap();
        assert!(!manager.test_connection().await);
        assert!(manager.acquire().await.is_err());
    }
}
