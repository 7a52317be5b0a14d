//! Fixtures shared by the sync tests.

use serde_json::Value;

use fleetsync_common::{CompanyId, TenantId};
use fleetsync_crypto::{CredentialVault, MasterKey};
use fleetsync_providers::{
    Asset, HttpSettings, ProviderEndpoints, ProviderFactory, ProviderKind,
};
use fleetsync_store::Provider;

use crate::orchestrator::{SyncOrchestrator, TaggedAsset};

/// An orchestrator whose vendor endpoints all point at `base_url`.
pub(crate) fn orchestrator(base_url: &str) -> SyncOrchestrator {
    let endpoints = ProviderEndpoints {
        spireon: base_url.to_string(),
        skybitz: base_url.to_string(),
        samsara: base_url.to_string(),
    };
    let factory = ProviderFactory::new(&HttpSettings::default(), endpoints).unwrap();
    SyncOrchestrator::new(CredentialVault::new(MasterKey::from_bytes([7u8; 32])), factory)
}

/// A provider in company `c1` / tenant `t1` with `credentials` sealed by the orchestrator's vault.
pub(crate) fn provider_with(
    orchestrator: &SyncOrchestrator,
    kind: ProviderKind,
    credentials: Value,
) -> Provider {
    let tenant = TenantId::new("t1").unwrap();
    let sealed = orchestrator.vault().encrypt(&tenant, &credentials).unwrap();
    Provider::new(CompanyId::new("c1").unwrap(), tenant, kind, "Test provider", sealed)
}

pub(crate) fn tagged(external_id: &str, name: &str) -> TaggedAsset {
    TaggedAsset {
        asset: Asset::new(external_id, name),
        company_id: CompanyId::new("c1").unwrap(),
        tenant_id: TenantId::new("t1").unwrap(),
        provider_id: fleetsync_common::ProviderId::new("p1").unwrap(),
    }
}
