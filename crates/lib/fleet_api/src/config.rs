//! API server configuration.

use std::time::Duration;

use fleet_core::auth::jwt::{DEFAULT_TOKEN_TTL_SECS, resolve_jwt_secret};
use fleet_core::auth::policy::DEFAULT_LOOKUP_TIMEOUT;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL; `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// JWT signing secret, raw or `base64:`-prefixed.
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub token_ttl_secs: i64,
    /// Upper bound on resolving a resource owner during authorization.
    pub lookup_timeout: Duration,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                  | Default                          |
    /// |---------------------------|----------------------------------|
    /// | `BIND_ADDR`               | `127.0.0.1:8080`                 |
    /// | `DATABASE_URL`            | unset (in-memory store)          |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file |
    /// | `TOKEN_TTL_SECS`          | `86400`                          |
    /// | `OWNER_LOOKUP_TIMEOUT_MS` | `2000`                           |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            jwt_secret: resolve_jwt_secret(),
            token_ttl_secs: env_parse("TOKEN_TTL_SECS").unwrap_or(DEFAULT_TOKEN_TTL_SECS),
            lookup_timeout: env_parse("OWNER_LOOKUP_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_LOOKUP_TIMEOUT),
        }
    }

    /// Configuration for tests and embedding: in-memory store, given secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            database_url: None,
            jwt_secret: jwt_secret.into(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
