//! Per-provider sync orchestration: decrypt, resolve, fetch, tag.

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use fleetsync_common::{CompanyId, Error, ProviderId, Result, TenantId};
use fleetsync_crypto::CredentialVault;
use fleetsync_providers::{
    Asset, ConnectionStatus, GpsProvider, ProviderAdapter, ProviderFactory, StatusReport,
};
use fleetsync_store::Provider;

/// An asset tagged with the provider it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedAsset {
    #[serde(flatten)]
    pub asset: Asset,
    pub company_id: CompanyId,
    pub tenant_id: TenantId,
    pub provider_id: ProviderId,
}

/// Result of one provider sync. Failures are values, never panics or early returns.
#[derive(Debug)]
pub enum SyncOutcome {
    Success { assets: Vec<TaggedAsset> },
    Failure { error: Error },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success { .. })
    }

    /// Convert into a `Result` for callers that propagate with `?`.
    pub fn into_result(self) -> Result<Vec<TaggedAsset>> {
        match self {
            SyncOutcome::Success { assets } => Ok(assets),
            SyncOutcome::Failure { error } => Err(error),
        }
    }
}

/// Result of a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTest {
    pub status: ConnectionStatus,
    pub trailer_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<StatusReport> for ConnectionTest {
    fn from(report: StatusReport) -> Self {
        Self {
            status: report.status,
            trailer_count: report.trailer_count,
            error: None,
        }
    }
}

impl ConnectionTest {
    fn failed(error: &Error) -> Self {
        Self {
            status: ConnectionStatus::Error,
            trailer_count: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Runs the vendor side of a sync for one provider.
#[derive(Debug, Clone)]
pub struct SyncOrchestrator {
    vault: CredentialVault,
    factory: ProviderFactory,
}

impl SyncOrchestrator {
    pub fn new(vault: CredentialVault, factory: ProviderFactory) -> Self {
        Self { vault, factory }
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn factory(&self) -> &ProviderFactory {
        &self.factory
    }

    /// Decrypt credentials and resolve the adapter, rejecting malformed documents.
    fn prepare(&self, provider: &Provider) -> Result<(ProviderAdapter, Value)> {
        let credentials = self
            .vault
            .decrypt(&provider.tenant_id, &provider.credentials_encrypted)?;
        let adapter = self.factory.get_provider(provider.kind);

        if !adapter.validate_credentials(&credentials) {
            return Err(Error::Credential(format!(
                "Stored {} credentials are incomplete",
                provider.kind
            )));
        }
        Ok((adapter, credentials))
    }

    async fn fetch(&self, provider: &Provider) -> Result<Vec<Asset>> {
        let (adapter, credentials) = self.prepare(provider)?;
        adapter.fetch_data(&credentials).await
    }

    /// Fetch and tag every asset the provider's vendor reports.
    ///
    /// # Postconditions
    /// - On success every asset carries the provider's company, tenant and id
    /// - Credential, vendor and transport errors come back as `SyncOutcome::Failure`
    pub async fn sync_provider(&self, provider: &Provider) -> SyncOutcome {
        info!(provider = %provider.id, kind = %provider.kind, "Fetching provider assets");

        match self.fetch(provider).await {
            Ok(assets) => {
                let assets = assets
                    .into_iter()
                    .map(|asset| TaggedAsset {
                        asset,
                        company_id: provider.company_id.clone(),
                        tenant_id: provider.tenant_id.clone(),
                        provider_id: provider.id.clone(),
                    })
                    .collect::<Vec<_>>();
                info!(provider = %provider.id, count = assets.len(), "Fetched provider assets");
                SyncOutcome::Success { assets }
            }
            Err(error) => {
                if error.is_vendor() {
                    warn!(provider = %provider.id, kind = %provider.kind, "Vendor request failed: {}", error);
                } else {
                    error!(provider = %provider.id, kind = %provider.kind, "Provider sync failed: {}", error);
                }
                SyncOutcome::Failure { error }
            }
        }
    }

    /// Check the vendor with the provider's credentials.
    pub async fn test_connection(&self, provider: &Provider) -> ConnectionTest {
        let check = async {
            let (adapter, credentials) = self.prepare(provider)?;
            adapter.get_status(&credentials).await
        };

        match check.await {
            Ok(report) => ConnectionTest::from(report),
            Err(error) => {
                warn!(provider = %provider.id, "Connection test failed: {}", error);
                ConnectionTest::failed(&error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{orchestrator, provider_with};
    use fleetsync_providers::ProviderKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_sync_tags_assets() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/fleet/trailers")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"data": [{"id": "s1", "name": "Trailer 1"}]}"#)
            .create_async()
            .await;
        let _stats = server
            .mock("GET", "/fleet/trailers/stats")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        let orchestrator = orchestrator(&server.url());
        let provider = provider_with(&orchestrator, ProviderKind::Samsara, json!({"apiToken": "t"}));

        let assets = orchestrator.sync_provider(&provider).await.into_result().unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].provider_id, provider.id);
        assert_eq!(assets[0].company_id, provider.company_id);
        assert_eq!(assets[0].asset.external_id, "s1");

        let json = serde_json::to_value(&assets[0]).unwrap();
        assert_eq!(json["externalId"], "s1");
        assert_eq!(json["providerId"], provider.id.as_str());
    }

    #[tokio::test]
    async fn test_undecryptable_credentials_fail_without_network() {
        let orchestrator = orchestrator("http://127.0.0.1:1");
        let mut provider =
            provider_with(&orchestrator, ProviderKind::Spireon, json!({"apiKey": "k"}));

        provider.credentials_encrypted = "bm90IHNlYWxlZA==".into();
        let outcome = orchestrator.sync_provider(&provider).await;
        assert!(!outcome.is_success());
        assert!(matches!(outcome.into_result(), Err(Error::Credential(_))));
    }

    #[tokio::test]
    async fn test_incomplete_credentials_are_credential_errors() {
        let orchestrator = orchestrator("http://127.0.0.1:1");
        let provider = provider_with(&orchestrator, ProviderKind::Spireon, json!({"apiKey": "k"}));

        let outcome = orchestrator.sync_provider(&provider).await;
        assert!(matches!(outcome.into_result(), Err(Error::Credential(_))));

        let test = orchestrator.test_connection(&provider).await;
        assert_eq!(test.status, ConnectionStatus::Error);
        assert!(test.error.is_some());
    }

    #[tokio::test]
    async fn test_vendor_failure_is_an_outcome() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/assets")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let orchestrator = orchestrator(&server.url());
        let provider = provider_with(
            &orchestrator,
            ProviderKind::Spireon,
            json!({"apiKey": "k", "username": "u", "password": "p", "nspireId": "n"}),
        );

        let outcome = orchestrator.sync_provider(&provider).await;
        assert!(matches!(outcome.into_result(), Err(Error::VendorConnection(_))));
    }

    #[tokio::test]
    async fn test_connection_reports_count() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/assets")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"count": 4, "data": [{"id": "a"}]}"#)
            .create_async()
            .await;

        let orchestrator = orchestrator(&server.url());
        let provider = provider_with(
            &orchestrator,
            ProviderKind::Spireon,
            json!({"apiKey": "k", "username": "u", "password": "p", "nspireId": "n"}),
        );

        let test = orchestrator.test_connection(&provider).await;
        assert_eq!(test.status, ConnectionStatus::Connected);
        assert_eq!(test.trailer_count, 4);
        assert!(test.error.is_none());
    }
}
