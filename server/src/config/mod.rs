use anyhow::{bail, Context, Result};
use std::env;
use std::net::SocketAddr;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_DATABASE_URL: &str = "postgres://localhost/gather";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => bail!("unknown STORAGE_BACKEND '{other}' (expected 'postgres' or 'memory')"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: PostgresConfig,
    /// Bearer token for the `/admin` routes; admin is disabled when unset.
    pub admin_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .with_context(|| "parse BIND_ADDR")?;

        let storage = match lookup("STORAGE_BACKEND") {
            Some(value) => StorageBackend::parse(&value)?,
            None => StorageBackend::Postgres,
        };

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .parse()
                .with_context(|| "parse DATABASE_MAX_CONNECTIONS")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let acquire_timeout_ms = match lookup("DATABASE_ACQUIRE_TIMEOUT_MS") {
            Some(value) => value
                .parse()
                .with_context(|| "parse DATABASE_ACQUIRE_TIMEOUT_MS")?,
            None => DEFAULT_ACQUIRE_TIMEOUT_MS,
        };

        let admin_token = lookup("ADMIN_TOKEN")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        Ok(Self {
            bind_addr,
            storage,
            postgres: PostgresConfig {
                url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                max_connections,
                acquire_timeout_ms,
            },
            admin_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 3001);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.postgres.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("STORAGE_BACKEND", "Memory"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("ADMIN_TOKEN", " secret "),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.postgres.max_connections, 12);
        assert_eq!(config.admin_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_blank_admin_token_disables_admin() {
        let config = Config::from_lookup(lookup_from(&[("ADMIN_TOKEN", "   ")])).unwrap();
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = Config::from_lookup(lookup_from(&[("BIND_ADDR", "nope")])).unwrap_err();
        assert!(err.to_string().contains("BIND_ADDR"));

        let err = Config::from_lookup(lookup_from(&[("STORAGE_BACKEND", "sqlite")])).unwrap_err();
        assert!(err.to_string().contains("sqlite"));
    }
}
