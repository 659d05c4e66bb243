//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`); not needed when `BAZAAR_STORE=memory`
//!
//! ## Optional
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 8080)
//! - `BAZAAR_STORE` - `postgres` or `memory` (default: postgres)
//! - `BAZAAR_TOKEN_TTL_HOURS` - Bearer token lifetime (default: 72, at most one year)
//! - `BAZAAR_STORE_TIMEOUT_SECS` - Pool acquire and statement timeout (default: 5)
//! - `BAZAAR_STORE_RETRY_ATTEMPTS` - Attempts for transient store failures (default: 3)
//! - `BAZAAR_MAX_BODY_BYTES` - Request body limit (default: 50 MiB)
//! - `BAZAAR_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `BAZAAR_LOG_FORMAT` - `json` for JSON log lines (default: human-readable)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::db::RetryPolicy;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;
/// Longest bearer token lifetime accepted.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where the API keeps its data.
#[derive(Clone)]
pub enum StoreBackend {
    Postgres { database_url: SecretString },
    /// In-process, lost on restart.
    Memory,
}

impl std::fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .finish(),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// API configuration.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct ApiConfig {
    pub store: StoreBackend,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token signing secret
    pub jwt_secret: SecretString,
    pub token_ttl: chrono::Duration,
    /// Bounds pool acquisition and each SQL statement
    pub store_timeout: Duration,
    pub retry: RetryPolicy,
    pub max_body_bytes: usize,
    /// `None` allows any origin
    pub cors_origins: Option<Vec<String>>,
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("store", &self.store)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("store_timeout", &self.store_timeout)
            .field("retry", &self.retry)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("cors_origins", &self.cors_origins)
            .field("log_format", &self.log_format)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

/// Variable lookup, so loading can be tested without touching the process
/// environment.
type Env<'a> = &'a dyn Fn(&str) -> Option<String>;

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    fn from_lookup(env: Env<'_>) -> Result<Self, ConfigError> {
        let store = match get_env_or_default(env, "BAZAAR_STORE", "postgres")
            .to_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => StoreBackend::Postgres {
                database_url: get_database_url(env, "BAZAAR_DATABASE_URL")?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "BAZAAR_STORE".to_string(),
                    format!("expected 'postgres' or 'memory', got '{other}'"),
                ));
            }
        };

        let host = parse_env(env, "BAZAAR_HOST", "127.0.0.1")?;
        let port = parse_env(env, "BAZAAR_PORT", "8080")?;

        let jwt_secret = get_validated_secret(env, "BAZAAR_JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "BAZAAR_JWT_SECRET")?;

        let ttl_hours: i64 = parse_env(env, "BAZAAR_TOKEN_TTL_HOURS", "72")?;
        let token_ttl = chrono::Duration::try_hours(ttl_hours)
            .filter(|_| (1..=MAX_TOKEN_TTL_HOURS).contains(&ttl_hours))
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "BAZAAR_TOKEN_TTL_HOURS".to_string(),
                    format!("must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
                )
            })?;

        let timeout_secs: u64 = parse_env(env, "BAZAAR_STORE_TIMEOUT_SECS", "5")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_STORE_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let attempts: u32 = parse_env(env, "BAZAAR_STORE_RETRY_ATTEMPTS", "3")?;

        let max_body_bytes = parse_env(
            env,
            "BAZAAR_MAX_BODY_BYTES",
            &DEFAULT_MAX_BODY_BYTES.to_string(),
        )?;

        let cors_origins = get_optional_env(env, "BAZAAR_CORS_ORIGINS").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        });

        let log_format = match get_optional_env(env, "BAZAAR_LOG_FORMAT").as_deref() {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            store,
            host,
            port,
            jwt_secret,
            token_ttl,
            store_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy {
                max_attempts: attempts.max(1),
                ..RetryPolicy::default()
            },
            max_body_bytes,
            cors_origins,
            log_format,
            sentry_dsn: get_optional_env(env, "SENTRY_DSN"),
            sentry_environment: get_optional_env(env, "SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(env: Env<'_>, key: &str) -> Result<String, ConfigError> {
    env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(env: Env<'_>, primary_key: &str) -> Result<SecretString, ConfigError> {
    env(primary_key)
        .or_else(|| env("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(env: Env<'_>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: Env<'_>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(env: Env<'_>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(env, key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(env: Env<'_>, key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(env, key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
