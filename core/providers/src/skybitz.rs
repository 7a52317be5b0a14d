//! SkyBitz QueryPositions adapter (JSON mode).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::credentials::{self, SkyBitzCredentials};
use crate::de;
use crate::http::{join, read_json, transport_error};
use crate::kind::ProviderKind;
use crate::model::{Asset, AssetLocation, StatusReport};
use crate::provider::GpsProvider;
use fleetsync_common::{Error, Result};

const VENDOR: &str = "SkyBitz";
const API_VERSION: &str = "2.76";
/// Error codes SkyBitz uses for bad customer or password.
const AUTH_ERROR_CODES: [i64; 2] = [97, 98];

#[derive(Debug, Deserialize)]
struct Envelope {
    skybitz: QueryPositions,
}

#[derive(Debug, Deserialize)]
struct QueryPositions {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default, deserialize_with = "de::one_or_many")]
    gls: Vec<Value>,
}

impl QueryPositions {
    /// The numeric result code. Absent or null means success.
    ///
    /// # Errors
    /// - `Error::VendorConnection` if the code is present but not an integer
    fn error_code(&self) -> Result<i64> {
        let code = match &self.error {
            None | Some(Value::Null) => return Ok(0),
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(_) => None,
        };
        code.ok_or_else(|| {
            Error::VendorConnection(format!("{} returned an unreadable error code", VENDOR))
        })
    }
}

/// One position report.
#[derive(Debug, Deserialize)]
struct Gls {
    #[serde(default, deserialize_with = "de::opt_string")]
    mtsn: Option<String>,
    #[serde(default)]
    asset: Option<GlsAsset>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    time: Option<String>,
    #[serde(default)]
    landmark: Option<Landmark>,
    #[serde(default, deserialize_with = "de::opt_string")]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlsAsset {
    #[serde(default, deserialize_with = "de::opt_string")]
    assetid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Landmark {
    #[serde(default, deserialize_with = "de::opt_string")]
    geoname: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    city: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    state: Option<String>,
}

impl Landmark {
    fn describe(self) -> Option<String> {
        let parts: Vec<String> = [self.geoname, self.city, self.state]
            .into_iter()
            .flatten()
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

impl Gls {
    fn into_asset(self) -> Option<Asset> {
        let external_id = self.asset.and_then(|a| a.assetid).or(self.mtsn)?;

        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(AssetLocation {
                lat,
                lng,
                address: self.landmark.and_then(Landmark::describe),
                timestamp: self.time.as_deref().and_then(de::parse_timestamp),
            }),
            _ => None,
        };

        let mut asset = Asset::new(external_id.clone(), external_id);
        asset.location = location;
        asset.raw_status = self.status;
        Some(asset)
    }
}

/// Adapter for the SkyBitz position query API.
///
/// SkyBitz reports positions only; vehicle fields are always `None`.
pub struct SkyBitzProvider {
    http: Client,
    base_url: String,
}

impl SkyBitzProvider {
    /// Create an adapter; credentials may override `base_url` with `baseURL`.
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn query_positions(&self, creds: &SkyBitzCredentials) -> Result<Vec<Gls>> {
        let base = creds
            .base_url
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(&self.base_url);
        debug!(customer = %creds.username, "Querying SkyBitz positions");

        // The password travels in the query string; never log the URL.
        let response = self
            .http
            .get(join(base, "QueryPositions"))
            .query(&[
                ("assetid", "ALL"),
                ("customer", creds.username.as_str()),
                ("password", creds.password.as_str()),
                ("version", API_VERSION),
                ("getJson", "1"),
            ])
            .send()
            .await
            .map_err(|e| transport_error(VENDOR, e))?;

        let envelope: Envelope = read_json(VENDOR, response).await?;
        let body = envelope.skybitz;

        match body.error_code()? {
            0 => Ok(de::decode_each(VENDOR, body.gls)),
            code if AUTH_ERROR_CODES.contains(&code) => Err(Error::VendorAuthentication(format!(
                "{} rejected the credentials (error {})",
                VENDOR, code
            ))),
            code => Err(Error::VendorConnection(format!(
                "{} returned error code {}",
                VENDOR, code
            ))),
        }
    }
}

#[async_trait]
impl GpsProvider for SkyBitzProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SkyBitz
    }

    fn validate_credentials(&self, credentials: &Value) -> bool {
        credentials::parse::<SkyBitzCredentials>(VENDOR, credentials).is_ok()
    }

    async fn fetch_data(&self, credentials: &Value) -> Result<Vec<Asset>> {
        let creds: SkyBitzCredentials = credentials::parse(VENDOR, credentials)?;
        let positions = self.query_positions(&creds).await?;

        let mut assets = Vec::with_capacity(positions.len());
        for gls in positions {
            match gls.into_asset() {
                Some(asset) => assets.push(asset),
                None => warn!("Skipping SkyBitz position without an asset id"),
            }
        }

        info!(count = assets.len(), "Fetched SkyBitz assets");
        Ok(assets)
    }

    async fn get_status(&self, credentials: &Value) -> Result<StatusReport> {
        let creds: SkyBitzCredentials = credentials::parse(VENDOR, credentials)?;
        let positions = self.query_positions(&creds).await?;
        Ok(StatusReport::connected(positions.len()))
    }
}
