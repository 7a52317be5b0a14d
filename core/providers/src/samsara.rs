//! Samsara Fleet API adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::credentials::{self, SamsaraCredentials};
use crate::de;
use crate::http::{join, read_json, transport_error};
use crate::kind::ProviderKind;
use crate::model::{Asset, AssetLocation, StatusReport};
use crate::provider::GpsProvider;
use fleetsync_common::Result;

const VENDOR: &str = "Samsara";
const PAGE_LIMIT: &str = "512";
const MAX_PAGES: usize = 1_000;
/// Raw status reported for a trailer with a GPS fix.
const ONLINE: &str = "online";

#[derive(Debug, Deserialize)]
struct Page {
    /// Raw entries; decoded one at a time so a bad entry is skipped, not fatal.
    #[serde(default, deserialize_with = "de::one_or_many")]
    data: Vec<Value>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    end_cursor: Option<String>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SamsaraTrailer {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    license_plate: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    vin: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    make: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    model: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i32")]
    year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct TrailerStats {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::one_or_many")]
    gps: Vec<GpsFix>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GpsFix {
    #[serde(default, deserialize_with = "de::opt_f64")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    time: Option<String>,
    #[serde(default)]
    reverse_geo: Option<ReverseGeo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReverseGeo {
    #[serde(default, deserialize_with = "de::opt_string")]
    formatted_location: Option<String>,
}

impl GpsFix {
    fn into_location(self) -> Option<AssetLocation> {
        Some(AssetLocation {
            lat: self.latitude?,
            lng: self.longitude?,
            address: self.reverse_geo.and_then(|g| g.formatted_location),
            timestamp: self.time.as_deref().and_then(de::parse_timestamp),
        })
    }
}

/// Adapter for the Samsara trailers API.
pub struct SamsaraProvider {
    http: Client,
    base_url: String,
}

impl SamsaraProvider {
    /// Create an adapter; credentials may override `base_url` with `apiUrl`.
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn base<'a>(&'a self, creds: &'a SamsaraCredentials) -> &'a str {
        creds
            .api_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(&self.base_url)
    }

    /// Collect every item of a cursor-paginated listing.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        creds: &SamsaraCredentials,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let url = join(self.base(creds), path);
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut request = self
                .http
                .get(&url)
                .bearer_auth(&creds.api_token)
                .query(params);

            if let Some(after) = &cursor {
                request = request.query(&[("after", after.as_str())]);
            }

            let response = request.send().await.map_err(|e| transport_error(VENDOR, e))?;
            let page: Page = read_json(VENDOR, response).await?;
            debug!(path, received = page.data.len(), "Fetched Samsara page");
            items.extend(de::decode_each::<T>(VENDOR, page.data));

            match page.pagination {
                Some(Pagination {
                    has_next_page: true,
                    end_cursor: Some(next),
                }) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn fetch_trailers(&self, creds: &SamsaraCredentials) -> Result<Vec<SamsaraTrailer>> {
        self.fetch_all(creds, "fleet/trailers", &[("limit", PAGE_LIMIT)])
            .await
    }
}

#[async_trait]
impl GpsProvider for SamsaraProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Samsara
    }

    fn validate_credentials(&self, credentials: &Value) -> bool {
        credentials::parse::<SamsaraCredentials>(VENDOR, credentials).is_ok()
    }

    async fn fetch_data(&self, credentials: &Value) -> Result<Vec<Asset>> {
        let creds: SamsaraCredentials = credentials::parse(VENDOR, credentials)?;

        let trailers = self.fetch_trailers(&creds).await?;
        let stats: Vec<TrailerStats> = self
            .fetch_all(&creds, "fleet/trailers/stats", &[("types", "gps")])
            .await?;

        let mut fixes: HashMap<String, AssetLocation> = HashMap::with_capacity(stats.len());
        for stat in stats {
            let Some(id) = stat.id else { continue };
            if let Some(location) = stat.gps.into_iter().filter_map(GpsFix::into_location).last() {
                fixes.insert(id, location);
            }
        }

        let mut assets = Vec::with_capacity(trailers.len());
        for trailer in trailers {
            let Some(external_id) = trailer.id else {
                warn!("Skipping Samsara trailer without an id");
                continue;
            };
            let name = trailer.name.unwrap_or_else(|| external_id.clone());
            let location = fixes.remove(&external_id);

            let mut asset = Asset::new(external_id, name);
            asset.vin = trailer.vin;
            asset.make = trailer.make;
            asset.model = trailer.model;
            asset.year = trailer.year;
            asset.plate = trailer.license_plate;
            asset.raw_status = location.as_ref().map(|_| ONLINE.to_string());
            asset.location = location;
            assets.push(asset);
        }

        info!(count = assets.len(), "Fetched Samsara assets");
        Ok(assets)
    }

    async fn get_status(&self, credentials: &Value) -> Result<StatusReport> {
        let creds: SamsaraCredentials = credentials::parse(VENDOR, credentials)?;
        let trailers = self.fetch_trailers(&creds).await?;
        Ok(StatusReport::connected(trailers.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpSettings;
    use fleetsync_common::Error;
    use mockito::Matcher;
    use serde_json::json;

    fn provider() -> SamsaraProvider {
        // Unroutable default; tests pass apiUrl in the credentials.
        SamsaraProvider::new(HttpSettings::default().build_client().unwrap(), "http://127.0.0.1:1")
    }

    fn creds(server: &mockito::ServerGuard) -> Value {
        json!({"apiToken": "samsara-token", "apiUrl": server.url()})
    }

    #[tokio::test]
    async fn test_fetch_joins_trailers_and_gps() {
        let mut server = mockito::Server::new_async().await;
        let page_one = server
            .mock("GET", "/fleet/trailers")
            .match_query(Matcher::Regex("^limit=512$".into()))
            .match_header("authorization", "Bearer samsara-token")
            .with_body(
                json!({
                    "data": [{"id": "t1", "name": "Trailer 53", "licensePlate": "ABC123", "year": 2021}],
                    "pagination": {"endCursor": "c1", "hasNextPage": true}
                })
                .to_string(),
            )
            .create_async()
            .await;
        let page_two = server
            .mock("GET", "/fleet/trailers")
            .match_query(Matcher::UrlEncoded("after".into(), "c1".into()))
            .with_body(
                json!({
                    "data": [{"id": "t2"}],
                    "pagination": {"endCursor": "", "hasNextPage": false}
                })
                .to_string(),
            )
            .create_async()
            .await;
        let stats = server
            .mock("GET", "/fleet/trailers/stats")
            .match_query(Matcher::UrlEncoded("types".into(), "gps".into()))
            .with_body(
                json!({
                    "data": [{
                        "id": "t1",
                        "gps": {
                            "latitude": 37.77,
                            "longitude": -122.41,
                            "time": "2024-05-01T12:00:00Z",
                            "reverseGeo": {"formattedLocation": "San Francisco, CA"}
                        }
                    }],
                    "pagination": {"hasNextPage": false}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let server_creds = creds(&server);
        let assets = provider().fetch_data(&server_creds).await.unwrap();
        page_one.assert_async().await;
        page_two.assert_async().await;
        stats.assert_async().await;

        assert_eq!(assets.len(), 2);
        let located = &assets[0];
        assert_eq!(located.plate.as_deref(), Some("ABC123"));
        assert_eq!(located.raw_status.as_deref(), Some("online"));
        assert_eq!(
            located.location.as_ref().unwrap().address.as_deref(),
            Some("San Francisco, CA")
        );

        let idle = &assets[1];
        assert_eq!(idle.name, "t2");
        assert!(idle.location.is_none());
        assert!(idle.raw_status.is_none());
    }

    #[tokio::test]
    async fn test_null_trailer_entry_is_skipped() {
        let mut server = mockito::Server::new_async().await;
        let _trailers = server
            .mock("GET", "/fleet/trailers")
            .match_query(Matcher::Any)
            .with_body(r#"{"data": [{"id": "t1", "name": "ok"}, null]}"#)
            .create_async()
            .await;
        let _stats = server
            .mock("GET", "/fleet/trailers/stats")
            .match_query(Matcher::Any)
            .with_body(r#"{"data": [null, {"id": "t1", "gps": [{"latitude": 1.5, "longitude": 2.5}]}]}"#)
            .create_async()
            .await;

        let assets = provider().fetch_data(&creds(&server)).await.unwrap();

        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].external_id, "t1");
        assert_eq!(assets[0].name, "ok");
        assert_eq!(assets[0].location.as_ref().unwrap().lat, 1.5);
    }

    #[tokio::test]
    async fn test_forbidden_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/fleet/trailers")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let err = provider().get_status(&creds(&server)).await.unwrap_err();
        assert!(matches!(err, Error::VendorAuthentication(_)));
    }

    #[tokio::test]
    async fn test_status_counts_trailers() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/fleet/trailers")
            .match_query(Matcher::Any)
            .with_body(r#"{"data": [{"id": "a"}, {"id": "b"}, {"id": "c"}]}"#)
            .create_async()
            .await;

        let report = provider().get_status(&creds(&server)).await.unwrap();
        assert_eq!(report.trailer_count, 3);
    }

    #[test]
    fn test_validate_credentials() {
        let provider = provider();
        assert!(provider.validate_credentials(&json!({"apiToken": "t"})));
        assert!(!provider.validate_credentials(&json!({"apiUrl": "https://api.samsara.com"})));
    }
}
