//! Fixtures shared by the store tests.

use crate::models::{NewTrailer, Provider, TrailerStatus};
use fleetsync_common::{CompanyId, ProviderId, TenantId};
use fleetsync_providers::ProviderKind;

pub(crate) fn new_trailer(provider: &str, external_id: &str, unit: &str) -> NewTrailer {
    NewTrailer {
        external_id: external_id.to_string(),
        company_id: CompanyId::new("c1").unwrap(),
        tenant_id: TenantId::new("t1").unwrap(),
        provider_id: ProviderId::new(provider).unwrap(),
        unit_number: unit.to_string(),
        vin: None,
        make: None,
        model: None,
        year: None,
        plate: None,
        location: None,
        last_sync: None,
        gps_status: TrailerStatus::Available,
        gps_enabled: true,
        status: TrailerStatus::Available,
        manual_location_override: false,
    }
}

pub(crate) fn provider() -> Provider {
    Provider::new(
        CompanyId::new("c1").unwrap(),
        TenantId::new("t1").unwrap(),
        ProviderKind::Spireon,
        "Spireon main",
        "c2VhbGVkIGNyZWRlbnRpYWxz",
    )
}
