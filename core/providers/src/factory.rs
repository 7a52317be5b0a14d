//! Resolution of a provider type string to a concrete adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::http::{HttpSettings, ProviderEndpoints};
use crate::kind::ProviderKind;
use crate::model::{Asset, StatusReport};
use crate::provider::GpsProvider;
use crate::samsara::SamsaraProvider;
use crate::skybitz::SkyBitzProvider;
use crate::spireon::SpireonProvider;
use fleetsync_common::Result;

/// A concrete adapter for one of the supported vendors.
pub enum ProviderAdapter {
    Spireon(SpireonProvider),
    SkyBitz(SkyBitzProvider),
    Samsara(SamsaraProvider),
}

impl ProviderAdapter {
    fn inner(&self) -> &dyn GpsProvider {
        match self {
            ProviderAdapter::Spireon(p) => p,
            ProviderAdapter::SkyBitz(p) => p,
            ProviderAdapter::Samsara(p) => p,
        }
    }
}

#[async_trait]
impl GpsProvider for ProviderAdapter {
    fn kind(&self) -> ProviderKind {
        self.inner().kind()
    }

    fn validate_credentials(&self, credentials: &Value) -> bool {
        self.inner().validate_credentials(credentials)
    }

    async fn fetch_data(&self, credentials: &Value) -> Result<Vec<Asset>> {
        self.inner().fetch_data(credentials).await
    }

    async fn get_status(&self, credentials: &Value) -> Result<StatusReport> {
        self.inner().get_status(credentials).await
    }
}

/// Hands out adapters sharing one HTTP client.
///
/// Adapters are cheap to build; a fresh one is created per call.
#[derive(Debug, Clone)]
pub struct ProviderFactory {
    http: Client,
    endpoints: ProviderEndpoints,
}

impl ProviderFactory {
    /// Create a factory with a client built from `settings`.
    ///
    /// # Errors
    /// - The HTTP client cannot be built (e.g. TLS backend failure)
    pub fn new(settings: &HttpSettings, endpoints: ProviderEndpoints) -> Result<Self> {
        Ok(Self::with_client(settings.build_client()?, endpoints))
    }

    /// Create a factory around an existing client.
    pub fn with_client(http: Client, endpoints: ProviderEndpoints) -> Self {
        Self { http, endpoints }
    }

    /// Configured vendor base URLs.
    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Adapter for a known vendor.
    pub fn get_provider(&self, kind: ProviderKind) -> ProviderAdapter {
        let http = self.http.clone();
        match kind {
            ProviderKind::Spireon => {
                ProviderAdapter::Spireon(SpireonProvider::new(http, &self.endpoints.spireon))
            }
            ProviderKind::SkyBitz => {
                ProviderAdapter::SkyBitz(SkyBitzProvider::new(http, &self.endpoints.skybitz))
            }
            ProviderKind::Samsara => {
                ProviderAdapter::Samsara(SamsaraProvider::new(http, &self.endpoints.samsara))
            }
        }
    }

    /// Adapter for a provider type string.
    ///
    /// # Errors
    /// - `Error::UnsupportedProvider` for a type outside the supported set
    pub fn resolve(&self, provider_type: &str) -> Result<ProviderAdapter> {
        let kind: ProviderKind = provider_type.parse()?;
        Ok(self.get_provider(kind))
    }

    /// The supported vendor names.
    pub fn supported(&self) -> Vec<&'static str> {
        ProviderKind::ALL.iter().map(ProviderKind::as_str).collect()
    }
}
