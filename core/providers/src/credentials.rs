//! Typed credential documents, one per vendor.
//!
//! Credentials are stored as encrypted JSON. After decryption an adapter
//! parses the document into its own type here; a document that does not
//! parse is a credential error, not a vendor error.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

use fleetsync_common::{Error, Result};

/// Parse a decrypted credential document into a vendor type.
pub(crate) fn parse<T>(vendor: &str, value: &Value) -> Result<T>
where
    T: DeserializeOwned + CredentialCheck,
{
    let creds: T = serde_json::from_value(value.clone())
        .map_err(|e| Error::Credential(format!("Invalid {} credentials: {}", vendor, e)))?;

    if let Some(missing) = creds.missing_field() {
        return Err(Error::Credential(format!(
            "Invalid {} credentials: '{}' is required",
            vendor, missing
        )));
    }
    Ok(creds)
}

/// Structural validation shared by every credential type.
pub(crate) trait CredentialCheck {
    /// Name of the first required field that is blank or malformed.
    fn missing_field(&self) -> Option<&'static str>;
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn bad_url(raw: Option<&str>) -> bool {
    match raw {
        Some(raw) if !blank(raw) => Url::parse(raw.trim()).is_err(),
        _ => false,
    }
}

/// Spireon NSpire credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpireonCredentials {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub nspire_id: String,
}

impl CredentialCheck for SpireonCredentials {
    fn missing_field(&self) -> Option<&'static str> {
        if blank(&self.api_key) {
            Some("apiKey")
        } else if blank(&self.username) {
            Some("username")
        } else if blank(&self.password) {
            Some("password")
        } else if blank(&self.nspire_id) {
            Some("nspireId")
        } else {
            None
        }
    }
}

impl fmt::Debug for SpireonCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpireonCredentials")
            .field("username", &self.username)
            .field("nspire_id", &self.nspire_id)
            .finish_non_exhaustive()
    }
}

/// SkyBitz credentials. `baseURL` overrides the configured endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct SkyBitzCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "baseURL", default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl CredentialCheck for SkyBitzCredentials {
    fn missing_field(&self) -> Option<&'static str> {
        if blank(&self.username) {
            Some("username")
        } else if blank(&self.password) {
            Some("password")
        } else if bad_url(self.base_url.as_deref()) {
            Some("baseURL")
        } else {
            None
        }
    }
}

impl fmt::Debug for SkyBitzCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkyBitzCredentials")
            .field("username", &self.username)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Samsara API token credentials. A missing `apiUrl` uses the configured endpoint.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamsaraCredentials {
    #[serde(default)]
    pub api_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl CredentialCheck for SamsaraCredentials {
    fn missing_field(&self) -> Option<&'static str> {
        if blank(&self.api_token) {
            Some("apiToken")
        } else if bad_url(self.api_url.as_deref()) {
            Some("apiUrl")
        } else {
            None
        }
    }
}

impl fmt::Debug for SamsaraCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamsaraCredentials")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}
