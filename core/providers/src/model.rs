//! Vendor-neutral asset model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use fleetsync_common::Error;

/// Last known position of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetLocation {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// Human readable address, when the vendor geocodes.
    pub address: Option<String>,
    /// When the fix was taken.
    pub timestamp: Option<DateTime<Utc>>,
}

/// A tracked asset as reported by one vendor, normalized.
///
/// Transient: produced by one sync call and consumed by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// The vendor's identifier for the asset.
    pub external_id: String,
    /// Vendor display name (falls back to the external id).
    pub name: String,
    pub vin: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub plate: Option<String>,
    /// `None` when the vendor has no fix for the asset.
    pub location: Option<AssetLocation>,
    /// Vendor status vocabulary, unmapped.
    pub raw_status: Option<String>,
}

impl Asset {
    /// Create an asset with only its identity set.
    pub fn new(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            vin: None,
            make: None,
            model: None,
            year: None,
            plate: None,
            location: None,
            raw_status: None,
        }
    }
}

/// Connection state of a configured provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Never tested or synced since the credentials last changed.
    #[default]
    Untested,
    /// The last test or sync succeeded.
    Connected,
    /// The last test or sync failed.
    Error,
}

impl ConnectionStatus {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Untested => "untested",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "untested" => Ok(ConnectionStatus::Untested),
            "connected" => Ok(ConnectionStatus::Connected),
            "error" => Ok(ConnectionStatus::Error),
            other => Err(Error::InvalidInput(format!("Unknown connection status: {}", other))),
        }
    }
}

/// Outcome of a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: ConnectionStatus,
    pub trailer_count: usize,
}

impl StatusReport {
    /// A successful check that saw `trailer_count` assets.
    pub fn connected(trailer_count: usize) -> Self {
        Self {
            status: ConnectionStatus::Connected,
            trailer_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_serializes_camel_case() {
        let mut asset = Asset::new("A-1", "Trailer 1");
        asset.raw_status = Some("stopped".to_string());

        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["externalId"], "A-1");
        assert_eq!(json["rawStatus"], "stopped");
        assert!(json["location"].is_null());
    }

    #[test]
    fn test_connection_status_roundtrip() {
        for status in [
            ConnectionStatus::Untested,
            ConnectionStatus::Connected,
            ConnectionStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<ConnectionStatus>().unwrap(), status);
        }
        assert!("pending".parse::<ConnectionStatus>().is_err());
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Untested);
    }
}
