//! Shared handler state.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use fleetsync_common::{ProviderId, Result, TtlCache};
use fleetsync_crypto::CredentialVault;
use fleetsync_providers::ProviderFactory;
use fleetsync_store::{SqliteStore, Store};
use fleetsync_sync::{ConnectionTest, SyncOrchestrator, SyncService};

use crate::config::AppConfig;

/// Cloned into every handler. Connection test results are cached per provider.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SyncService<dyn Store>>,
    pub status_cache: Arc<TtlCache<ProviderId, ConnectionTest>>,
}

impl AppState {
    pub fn new(service: SyncService<dyn Store>, status_ttl: Duration) -> Self {
        Self {
            service: Arc::new(service),
            status_cache: Arc::new(TtlCache::new(status_ttl)),
        }
    }

    /// Open the store, resolve the master key and wire the sync service.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn Store> = if config.is_in_memory() {
            info!("Using in-memory database");
            Arc::new(SqliteStore::in_memory()?)
        } else {
            info!(path = %config.database, "Opening database");
            Arc::new(SqliteStore::open(&config.database)?)
        };

        let vault = CredentialVault::new(config.master_key()?);
        let factory = ProviderFactory::new(&config.http_settings(), config.endpoints())?;
        let service = SyncService::new(store, SyncOrchestrator::new(vault, factory));

        Ok(Self::new(service, config.status_cache_ttl()))
    }
}
