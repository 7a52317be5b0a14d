//! Shared HTTP plumbing for the vendor adapters.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use fleetsync_common::{Error, Result};

/// Default Spireon NSpire REST base.
pub const SPIREON_BASE_URL: &str = "https://services.spireon.com/v0/rest";
/// Default SkyBitz XML/JSON gateway.
pub const SKYBITZ_BASE_URL: &str = "https://xml.skybitz.com:9443";
/// Default Samsara API base.
pub const SAMSARA_BASE_URL: &str = "https://api.samsara.com";

/// Bytes of an error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Settings for the HTTP client shared by every adapter.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("FleetSync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpSettings {
    /// Build a client from these settings.
    pub fn build_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| Error::InvalidInput(format!("Cannot build HTTP client: {}", e)))
    }
}

/// Base URLs for each vendor. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub spireon: String,
    pub skybitz: String,
    pub samsara: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            spireon: SPIREON_BASE_URL.to_string(),
            skybitz: SKYBITZ_BASE_URL.to_string(),
            samsara: SAMSARA_BASE_URL.to_string(),
        }
    }
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Map a transport failure (DNS, TLS, timeout) to a vendor error.
pub(crate) fn transport_error(vendor: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::VendorConnection(format!("{} request timed out", vendor))
    } else {
        Error::VendorConnection(format!("{} request failed: {}", vendor, err))
    }
}

/// Check the status of a vendor response and decode its JSON body.
///
/// 401 and 403 are authentication failures; any other non-2xx status is a
/// connection failure carrying the status and a prefix of the body.
pub(crate) async fn read_json<T: DeserializeOwned>(vendor: &str, response: Response) -> Result<T> {
    let status = response.status();
    debug!(vendor, status = status.as_u16(), "Vendor response");

    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| Error::VendorConnection(format!("{} returned an unreadable body: {}", vendor, e)));
    }

    let body = response.text().await.unwrap_or_default();
    let body = truncate(body.trim());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::VendorAuthentication(
            format!("{} rejected the credentials ({})", vendor, status.as_u16()),
        )),
        _ => Err(Error::VendorConnection(format!(
            "{} API error: {} - {}",
            vendor,
            status.as_u16(),
            body
        ))),
    }
}

fn truncate(body: &str) -> &str {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_join() {
        assert_eq!(join("https://a.test/", "/assets"), "https://a.test/assets");
        assert_eq!(join("https://a.test/v0", "assets"), "https://a.test/v0/assets");
    }

    #[test]
    fn test_default_user_agent() {
        let settings = HttpSettings::default();
        assert!(settings.user_agent.starts_with("FleetSync/"));
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(settings.build_client().is_ok());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "é".repeat(MAX_ERROR_BODY);
        let cut = truncate(&long);
        assert!(cut.len() <= MAX_ERROR_BODY);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn test_read_json_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body(r#"{"count": 3}"#)
            .create_async()
            .await;
        let denied = server.mock("GET", "/denied").with_status(403).create_async().await;
        let broken = server
            .mock("GET", "/broken")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;
        let garbage = server
            .mock("GET", "/garbage")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let client = HttpSettings::default().build_client().unwrap();
        let get = |path: &str| client.get(join(&server.url(), path)).send();

        let value: Value = read_json("Test", get("/ok").await.unwrap()).await.unwrap();
        assert_eq!(value["count"], 3);

        let err = read_json::<Value>("Test", get("/denied").await.unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::VendorAuthentication(_)));

        let err = read_json::<Value>("Test", get("/broken").await.unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::VendorConnection(ref m) if m.contains("503") && m.contains("maintenance")));

        let err = read_json::<Value>("Test", get("/garbage").await.unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::VendorConnection(_)));

        ok.assert_async().await;
        denied.assert_async().await;
        broken.assert_async().await;
        garbage.assert_async().await;
    }
}
