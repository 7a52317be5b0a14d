//! Store trait definitions.

use async_trait::async_trait;

use crate::models::{NewTrailer, Provider, Trailer};
use fleetsync_common::{CompanyId, ProviderId, Result, TrailerId};

/// Persistence for trailers.
///
/// Implementations enforce two uniqueness invariants and report a violation
/// as `Error::Conflict`:
/// - `(tenant_id, unit_number)`
/// - `(company_id, external_id)`
#[async_trait]
pub trait TrailerStore: Send + Sync {
    /// Find the trailer a vendor asset maps to within a company.
    async fn find_by_external_id(
        &self,
        company_id: &CompanyId,
        external_id: &str,
    ) -> Result<Option<Trailer>>;

    /// Get a trailer by id.
    async fn get_trailer(&self, id: &TrailerId) -> Result<Option<Trailer>>;

    /// Create a trailer.
    ///
    /// # Postconditions
    /// - Returns the stored record with a fresh id and timestamps
    ///
    /// # Errors
    /// - `Error::Conflict` if either uniqueness invariant would break
    async fn create(&self, trailer: NewTrailer) -> Result<Trailer>;

    /// Overwrite a stored trailer. `updated_at` is set by the store.
    ///
    /// # Errors
    /// - `Error::NotFound` if the id is unknown
    /// - `Error::Conflict` if either uniqueness invariant would break
    async fn update(&self, trailer: Trailer) -> Result<Trailer>;

    /// All trailers synced from one provider.
    async fn list_by_provider(&self, provider_id: &ProviderId) -> Result<Vec<Trailer>>;

    /// Delete every trailer synced from one provider. Returns how many were removed.
    async fn delete_by_provider(&self, provider_id: &ProviderId) -> Result<u64>;
}

/// Persistence for provider connections.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// Get a provider by id.
    async fn get_provider(&self, id: &ProviderId) -> Result<Option<Provider>>;

    /// Insert a new provider.
    ///
    /// # Errors
    /// - `Error::Conflict` if the id is taken
    async fn insert_provider(&self, provider: Provider) -> Result<Provider>;

    /// Overwrite a stored provider. `updated_at` is set by the store.
    ///
    /// # Errors
    /// - `Error::NotFound` if the id is unknown
    async fn update_provider(&self, provider: Provider) -> Result<Provider>;

    /// Delete a provider. Its trailers are left in place.
    ///
    /// # Errors
    /// - `Error::NotFound` if the id is unknown
    async fn delete_provider(&self, id: &ProviderId) -> Result<()>;
}

/// Both stores behind one handle.
pub trait Store: TrailerStore + ProviderStore {}

impl<T: TrailerStore + ProviderStore> Store for T {}
