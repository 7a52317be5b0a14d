//! GPS provider trait definition.

use async_trait::async_trait;
use serde_json::Value;

use crate::kind::ProviderKind;
use crate::model::{Asset, StatusReport};
use fleetsync_common::Result;

/// One GPS vendor behind a uniform interface.
///
/// Adapters are stateless apart from the HTTP client: credentials arrive
/// already decrypted on every call and are never cached.
#[async_trait]
pub trait GpsProvider: Send + Sync {
    /// Which vendor this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Check that a credential document has every field this vendor needs.
    ///
    /// Structural only; no network call is made.
    fn validate_credentials(&self, credentials: &Value) -> bool;

    /// Fetch every asset visible to the credentials, following pagination.
    ///
    /// # Postconditions
    /// - Assets missing a location, VIN or other optional data are still returned
    ///
    /// # Errors
    /// - `Error::Credential` if the document does not parse
    /// - `Error::VendorAuthentication` if the vendor rejects the credentials
    /// - `Error::VendorConnection` for transport, status or decoding failures
    async fn fetch_data(&self, credentials: &Value) -> Result<Vec<Asset>>;

    /// Check connectivity with a cheap vendor request.
    ///
    /// # Errors
    /// Same as [`GpsProvider::fetch_data`].
    async fn get_status(&self, credentials: &Value) -> Result<StatusReport>;
}
