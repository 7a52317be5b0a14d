//! Spireon NSpire REST adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::credentials::{self, SpireonCredentials};
use crate::de;
use crate::http::{join, read_json, transport_error};
use crate::kind::ProviderKind;
use crate::model::{Asset, AssetLocation, StatusReport};
use crate::provider::GpsProvider;
use fleetsync_common::Result;

const VENDOR: &str = "Spireon";
/// Assets requested per page.
const PAGE_SIZE: usize = 100;
/// Hard stop for a vendor that keeps returning full pages.
const MAX_PAGES: usize = 1_000;

#[derive(Debug, Deserialize)]
struct AssetPage {
    #[serde(default, deserialize_with = "de::lenient_i64")]
    count: i64,
    /// Raw entries; decoded one at a time so a bad entry is skipped, not fatal.
    #[serde(default, deserialize_with = "de::one_or_many")]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpireonAsset {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    vin: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    make: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    model: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i32")]
    year: Option<i32>,
    #[serde(default, deserialize_with = "de::opt_string")]
    license_plate: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    status: Option<String>,
    #[serde(default)]
    last_location: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastLocation {
    #[serde(default, deserialize_with = "de::opt_f64")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    lng: Option<f64>,
    #[serde(default)]
    address: Option<Value>,
    #[serde(default, deserialize_with = "de::opt_string")]
    event_date_time: Option<String>,
}

impl SpireonAsset {
    fn into_asset(self) -> Option<Asset> {
        let external_id = self.id?;
        let name = self.name.unwrap_or_else(|| external_id.clone());

        let mut asset = Asset::new(external_id, name);
        asset.vin = self.vin;
        asset.make = self.make;
        asset.model = self.model;
        asset.year = self.year;
        asset.plate = self.license_plate;
        asset.raw_status = self.status;
        asset.location = self.last_location.and_then(parse_location);
        Some(asset)
    }
}

fn parse_location(raw: Value) -> Option<AssetLocation> {
    let loc: LastLocation = serde_json::from_value(raw).ok()?;
    Some(AssetLocation {
        lat: loc.lat?,
        lng: loc.lng?,
        address: loc.address.as_ref().and_then(format_address),
        timestamp: loc.event_date_time.as_deref().and_then(de::parse_timestamp),
    })
}

/// Render an address that is either free text or `{line1, city, stateOrProvince, postalCode}`.
fn format_address(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => de::non_empty(s.clone()),
        Value::Object(map) => {
            let part = |key: &str| {
                map.get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            };
            let region = [part("stateOrProvince"), part("postalCode")]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            let parts: Vec<&str> = [part("line1"), part("city")]
                .into_iter()
                .flatten()
                .chain((!region.is_empty()).then_some(region.as_str()))
                .collect();

            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

/// Adapter for the Spireon NSpire asset API.
pub struct SpireonProvider {
    http: Client,
    base_url: String,
}

impl SpireonProvider {
    /// Create an adapter against `base_url` (e.g. `https://services.spireon.com/v0/rest`).
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn fetch_page(
        &self,
        creds: &SpireonCredentials,
        start: usize,
        max: usize,
    ) -> Result<AssetPage> {
        let url = join(&self.base_url, "assets");
        debug!(start, max, "Fetching Spireon assets");

        let response = self
            .http
            .get(&url)
            .basic_auth(&creds.username, Some(&creds.password))
            .header("X-Nspire-AppToken", &creds.api_key)
            .header("X-Nspire-CorrelationId", &creds.nspire_id)
            .query(&[("max", max.to_string()), ("start", start.to_string())])
            .send()
            .await
            .map_err(|e| transport_error(VENDOR, e))?;

        read_json(VENDOR, response).await
    }
}

#[async_trait]
impl GpsProvider for SpireonProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Spireon
    }

    fn validate_credentials(&self, credentials: &Value) -> bool {
        credentials::parse::<SpireonCredentials>(VENDOR, credentials).is_ok()
    }

    async fn fetch_data(&self, credentials: &Value) -> Result<Vec<Asset>> {
        let creds: SpireonCredentials = credentials::parse(VENDOR, credentials)?;

        let mut assets = Vec::new();
        let mut start = 0usize;

        for _ in 0..MAX_PAGES {
            let page = self.fetch_page(&creds, start, PAGE_SIZE).await?;
            let received = page.data.len();
            if received == 0 {
                break;
            }
            start += received;

            for raw in de::decode_each::<SpireonAsset>(VENDOR, page.data) {
                match raw.into_asset() {
                    Some(asset) => assets.push(asset),
                    None => warn!("Skipping Spireon asset without an id"),
                }
            }

            let total = usize::try_from(page.count).unwrap_or(0);
            if (total > 0 && start >= total) || received < PAGE_SIZE {
                break;
            }
        }

        info!(count = assets.len(), "Fetched Spireon assets");
        Ok(assets)
    }

    async fn get_status(&self, credentials: &Value) -> Result<StatusReport> {
        let creds: SpireonCredentials = credentials::parse(VENDOR, credentials)?;
        let page = self.fetch_page(&creds, 0, 1).await?;

        let count = usize::try_from(page.count).unwrap_or(0).max(page.data.len());
        Ok(StatusReport::connected(count))
    }
}
