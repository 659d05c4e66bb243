//! Subcommand implementations.
//!
//! Every command reads `BAZAAR_DATABASE_URL` (falling back to
//! `DATABASE_URL`), loading `.env` first if present.

pub mod migrate;
pub mod orders;
pub mod seed;

use std::time::Duration;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use bazaar_api::db::{self, PgStore, RepositoryError, RetryPolicy};

/// CLI connections wait longer than the server's request path.
const CLI_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// The seed file failed validation.
    #[error("Invalid seed file: {0}")]
    InvalidSeed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(bazaar_core::OrderId),
}

/// Database URL from the environment.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("BAZAAR_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("BAZAAR_DATABASE_URL"))
}

async fn connect() -> Result<PgPool, CommandError> {
    let database_url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url, CLI_STORE_TIMEOUT).await?)
}

async fn store() -> Result<PgStore, CommandError> {
    Ok(PgStore::new(connect().await?, RetryPolicy::default()))
}
