use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::store::memory::InMemoryStore;
use crate::store::postgres::PostgresStore;
use crate::store::{EventStore, StoreResult};

/// Shared handler state. Cloned per request, so everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    /// Bearer token for the admin routes; `None` disables them.
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>, admin_token: Option<String>) -> Self {
        Self {
            store,
            admin_token: admin_token.map(Arc::from),
        }
    }

    /// Connects the configured storage backend.
    pub async fn from_config(config: &Config) -> StoreResult<Self> {
        let store: Arc<dyn EventStore> = match config.storage {
            StorageBackend::Postgres => Arc::new(PostgresStore::connect(&config.postgres).await?),
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, data is lost on restart");
                Arc::new(InMemoryStore::new())
            }
        };
        Ok(Self::new(store, config.admin_token.clone()))
    }
}
