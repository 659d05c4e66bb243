//! `PostgreSQL` store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use super::{RepositoryError, RetryPolicy, Store};

/// Create a `PostgreSQL` connection pool.
///
/// `timeout` bounds both connection acquisition and every statement
/// (`statement_timeout` is set on each connection).
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(
    database_url: &SecretString,
    timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    let statement_timeout_ms = timeout.as_millis().to_string();
    let options = PgConnectOptions::from_str(database_url.expose_secret())?
        .options([("statement_timeout", statement_timeout_ms)]);

    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(timeout)
        .connect_with(options)
        .await
}

/// [`Store`] backed by a `PostgreSQL` pool.
///
/// Reads retry on transient failures; writes retry only when no connection
/// could be acquired.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(super) const fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        let pool = &self.pool;
        self.retry
            .read("ping", move || async move {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            })
            .await
    }
}
