//! Persisted records: providers and trailers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use fleetsync_common::{CompanyId, Error, ProviderId, TenantId, TrailerId};
use fleetsync_providers::{AssetLocation, ConnectionStatus, ProviderKind};

/// Availability of a trailer, also used for its GPS status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailerStatus {
    #[default]
    Available,
    Disconnected,
}

impl TrailerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrailerStatus::Available => "available",
            TrailerStatus::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for TrailerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrailerStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(TrailerStatus::Available),
            "disconnected" => Ok(TrailerStatus::Disconnected),
            other => Err(Error::InvalidInput(format!("Unknown trailer status: {}", other))),
        }
    }
}

/// A configured connection to one GPS vendor for one company.
///
/// Credentials are only ever held encrypted and are never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: ProviderId,
    pub company_id: CompanyId,
    pub tenant_id: TenantId,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub credentials_encrypted: String,
    pub status: ConnectionStatus,
    pub last_error: Option<String>,
    pub last_trailer_count: Option<i64>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    /// A new, untested provider with a generated id.
    pub fn new(
        company_id: CompanyId,
        tenant_id: TenantId,
        kind: ProviderKind,
        name: impl Into<String>,
        credentials_encrypted: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProviderId::generate(),
            company_id,
            tenant_id,
            kind,
            name: name.into(),
            credentials_encrypted: credentials_encrypted.into(),
            status: ConnectionStatus::Untested,
            last_error: None,
            last_trailer_count: None,
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the stored credentials; the connection must be tested again.
    pub fn replace_credentials(&mut self, credentials_encrypted: String) {
        self.credentials_encrypted = credentials_encrypted;
        self.status = ConnectionStatus::Untested;
        self.last_error = None;
    }
}

/// A trailer as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trailer {
    pub id: TrailerId,
    /// The vendor's asset id; unique within the company.
    pub external_id: String,
    pub company_id: CompanyId,
    pub tenant_id: TenantId,
    pub provider_id: ProviderId,
    /// Fleet-visible name; unique within the tenant.
    pub unit_number: String,
    pub vin: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub plate: Option<String>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_address: Option<String>,
    pub last_gps_update: Option<DateTime<Utc>>,
    pub last_sync: Option<DateTime<Utc>>,
    pub gps_status: TrailerStatus,
    pub gps_enabled: bool,
    pub status: TrailerStatus,
    /// When set, a dispatcher pinned the location and sync leaves it alone.
    pub manual_location_override: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trailer {
    /// Overwrite the last known position.
    pub fn apply_location(&mut self, location: &AssetLocation) {
        self.last_latitude = Some(location.lat);
        self.last_longitude = Some(location.lng);
        self.last_address = location.address.clone();
        self.last_gps_update = location.timestamp;
    }

    /// Forget the last known position.
    pub fn clear_location(&mut self) {
        self.last_latitude = None;
        self.last_longitude = None;
        self.last_address = None;
        self.last_gps_update = None;
    }
}

/// Fields for a trailer about to be created. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrailer {
    pub external_id: String,
    pub company_id: CompanyId,
    pub tenant_id: TenantId,
    pub provider_id: ProviderId,
    pub unit_number: String,
    pub vin: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub plate: Option<String>,
    pub location: Option<AssetLocation>,
    pub last_sync: Option<DateTime<Utc>>,
    pub gps_status: TrailerStatus,
    pub gps_enabled: bool,
    pub status: TrailerStatus,
    pub manual_location_override: bool,
}

impl NewTrailer {
    /// Materialize into a stored record.
    pub fn into_trailer(self, id: TrailerId, now: DateTime<Utc>) -> Trailer {
        let mut trailer = Trailer {
            id,
            external_id: self.external_id,
            company_id: self.company_id,
            tenant_id: self.tenant_id,
            provider_id: self.provider_id,
            unit_number: self.unit_number,
            vin: self.vin,
            make: self.make,
            model: self.model,
            year: self.year,
            plate: self.plate,
            last_latitude: None,
            last_longitude: None,
            last_address: None,
            last_gps_update: None,
            last_sync: self.last_sync,
            gps_status: self.gps_status,
            gps_enabled: self.gps_enabled,
            status: self.status,
            manual_location_override: self.manual_location_override,
            created_at: now,
            updated_at: now,
        };
        if let Some(location) = &self.location {
            trailer.apply_location(location);
        }
        trailer
    }
}
