//! Provider lifecycle and sync entry points used by the server and CLI.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use fleetsync_common::{CompanyId, Error, ProviderId, Result, TenantId};
use fleetsync_providers::{ConnectionStatus, GpsProvider, ProviderKind};
use fleetsync_store::{Provider, ProviderStore, Store, TrailerStore};

use crate::orchestrator::{ConnectionTest, SyncOrchestrator, SyncOutcome};
use crate::reconcile::{ReconcileSummary, Reconciler};

/// Input for registering a provider. Credentials arrive in plaintext.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProvider {
    pub company_id: CompanyId,
    pub tenant_id: TenantId,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub name: String,
    pub credentials: Value,
}

/// Partial update of a provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUpdate {
    pub name: Option<String>,
    pub credentials: Option<Value>,
}

/// Coordinates the store, the orchestrator and the reconciler.
pub struct SyncService<S: Store + ?Sized> {
    store: Arc<S>,
    orchestrator: SyncOrchestrator,
    reconciler: Reconciler<S>,
}

impl<S: Store + ?Sized> SyncService<S> {
    pub fn new(store: Arc<S>, orchestrator: SyncOrchestrator) -> Self {
        Self {
            reconciler: Reconciler::new(Arc::clone(&store)),
            store,
            orchestrator,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Load a provider or fail with `Error::NotFound`.
    pub async fn provider(&self, id: &ProviderId) -> Result<Provider> {
        self.store
            .get_provider(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Provider {} not found", id)))
    }

    fn seal(&self, kind: ProviderKind, tenant: &TenantId, credentials: &Value) -> Result<String> {
        let adapter = self.orchestrator.factory().get_provider(kind);
        if !adapter.validate_credentials(credentials) {
            return Err(Error::Credential(format!(
                "Credentials are incomplete for a {} provider",
                kind
            )));
        }
        self.orchestrator.vault().encrypt(tenant, credentials)
    }

    /// Register a provider with encrypted credentials. It starts `untested`.
    ///
    /// # Errors
    /// - `Error::InvalidInput` for a blank name
    /// - `Error::Credential` if the credentials lack a required field
    pub async fn register(&self, input: NewProvider) -> Result<Provider> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Provider name cannot be empty".to_string()));
        }

        let sealed = self.seal(input.kind, &input.tenant_id, &input.credentials)?;
        let provider = Provider::new(input.company_id, input.tenant_id, input.kind, name, sealed);

        let provider = self.store.insert_provider(provider).await?;
        info!(provider = %provider.id, kind = %provider.kind, "Registered provider");
        Ok(provider)
    }

    /// Rename a provider and/or replace its credentials.
    ///
    /// New credentials are re-encrypted and reset the status to `untested`.
    pub async fn update(&self, id: &ProviderId, update: ProviderUpdate) -> Result<Provider> {
        let mut provider = self.provider(id).await?;

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::InvalidInput("Provider name cannot be empty".to_string()));
            }
            provider.name = name.to_string();
        }
        if let Some(credentials) = update.credentials {
            let sealed = self.seal(provider.kind, &provider.tenant_id, &credentials)?;
            provider.replace_credentials(sealed);
        }

        self.store.update_provider(provider).await
    }

    /// Delete a provider, optionally with its trailers. Returns trailers removed.
    ///
    /// Trailers go first so a failed cascade leaves the provider in place to retry.
    pub async fn remove(&self, id: &ProviderId, cascade: bool) -> Result<u64> {
        self.provider(id).await?;
        let removed = if cascade {
            self.store.delete_by_provider(id).await?
        } else {
            0
        };
        self.store.delete_provider(id).await?;
        info!(provider = %id, cascade, trailers_removed = removed, "Removed provider");
        Ok(removed)
    }

    /// Sync one provider end to end and record the outcome on it.
    ///
    /// # Errors
    /// - `Error::NotFound` if the provider does not exist
    /// - The credential or vendor error that aborted the sync
    pub async fn sync(&self, id: &ProviderId) -> Result<ReconcileSummary> {
        let mut provider = self.provider(id).await?;

        match self.orchestrator.sync_provider(&provider).await {
            SyncOutcome::Success { assets } => {
                let summary = self.reconciler.reconcile(&assets).await;

                provider.status = ConnectionStatus::Connected;
                provider.last_error = None;
                provider.last_trailer_count = Some(assets.len() as i64);
                provider.last_sync_at = Some(Utc::now());
                self.record(provider).await;

                Ok(summary)
            }
            SyncOutcome::Failure { error } => {
                provider.status = ConnectionStatus::Error;
                provider.last_error = Some(error.to_string());
                self.record(provider).await;

                Err(error)
            }
        }
    }

    /// Test one provider and record the status on it.
    pub async fn test(&self, id: &ProviderId) -> Result<ConnectionTest> {
        let mut provider = self.provider(id).await?;
        let test = self.orchestrator.test_connection(&provider).await;

        provider.status = test.status;
        provider.last_error = test.error.clone();
        if test.status == ConnectionStatus::Connected {
            provider.last_trailer_count = Some(test.trailer_count as i64);
        }
        self.record(provider).await;

        Ok(test)
    }

    /// Persist provider bookkeeping. A failure here never hides the sync result.
    async fn record(&self, provider: Provider) {
        let id = provider.id.clone();
        if let Err(e) = self.store.update_provider(provider).await {
            warn!(provider = %id, "Failed to record provider status: {}", e);
        }
    }
}
