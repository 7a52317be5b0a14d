//! In-memory store for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::models::{NewTrailer, Provider, Trailer};
use crate::store::{ProviderStore, TrailerStore};
use fleetsync_common::{CompanyId, Error, ProviderId, Result, TrailerId};

/// In-memory store.
///
/// Enforces the same uniqueness rules as the SQLite store. All data is
/// lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    trailers: RwLock<HashMap<TrailerId, Trailer>>,
    providers: RwLock<HashMap<ProviderId, Provider>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Check `candidate` against every other stored trailer.
fn check_unique(trailers: &HashMap<TrailerId, Trailer>, candidate: &Trailer) -> Result<()> {
    for existing in trailers.values().filter(|t| t.id != candidate.id) {
        if existing.tenant_id == candidate.tenant_id && existing.unit_number == candidate.unit_number
        {
            return Err(Error::Conflict(format!(
                "Unit number '{}' already exists for tenant {}",
                candidate.unit_number, candidate.tenant_id
            )));
        }
        if existing.company_id == candidate.company_id
            && existing.external_id == candidate.external_id
        {
            return Err(Error::Conflict(format!(
                "External id '{}' already exists for company {}",
                candidate.external_id, candidate.company_id
            )));
        }
    }
    Ok(())
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored trailers.
    pub fn trailer_count(&self) -> usize {
        read(&self.trailers).len()
    }
}

#[async_trait]
impl TrailerStore for MemoryStore {
    async fn find_by_external_id(
        &self,
        company_id: &CompanyId,
        external_id: &str,
    ) -> Result<Option<Trailer>> {
        Ok(read(&self.trailers)
            .values()
            .find(|t| &t.company_id == company_id && t.external_id == external_id)
            .cloned())
    }

    async fn get_trailer(&self, id: &TrailerId) -> Result<Option<Trailer>> {
        Ok(read(&self.trailers).get(id).cloned())
    }

    async fn create(&self, trailer: NewTrailer) -> Result<Trailer> {
        let trailer = trailer.into_trailer(TrailerId::generate(), Utc::now());

        let mut trailers = write(&self.trailers);
        check_unique(&trailers, &trailer)?;
        debug!(id = %trailer.id, unit = %trailer.unit_number, "Created trailer");
        trailers.insert(trailer.id.clone(), trailer.clone());
        Ok(trailer)
    }

    async fn update(&self, mut trailer: Trailer) -> Result<Trailer> {
        let mut trailers = write(&self.trailers);
        if !trailers.contains_key(&trailer.id) {
            return Err(Error::NotFound(format!("Trailer {} not found", trailer.id)));
        }
        check_unique(&trailers, &trailer)?;

        trailer.updated_at = Utc::now();
        trailers.insert(trailer.id.clone(), trailer.clone());
        Ok(trailer)
    }

    async fn list_by_provider(&self, provider_id: &ProviderId) -> Result<Vec<Trailer>> {
        let mut found: Vec<Trailer> = read(&self.trailers)
            .values()
            .filter(|t| &t.provider_id == provider_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.unit_number.cmp(&b.unit_number));
        Ok(found)
    }

    async fn delete_by_provider(&self, provider_id: &ProviderId) -> Result<u64> {
        let mut trailers = write(&self.trailers);
        let before = trailers.len();
        trailers.retain(|_, t| &t.provider_id != provider_id);
        Ok((before - trailers.len()) as u64)
    }
}

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn get_provider(&self, id: &ProviderId) -> Result<Option<Provider>> {
        Ok(read(&self.providers).get(id).cloned())
    }

    async fn insert_provider(&self, provider: Provider) -> Result<Provider> {
        let mut providers = write(&self.providers);
        if providers.contains_key(&provider.id) {
            return Err(Error::Conflict(format!("Provider {} already exists", provider.id)));
        }
        providers.insert(provider.id.clone(), provider.clone());
        Ok(provider)
    }

    async fn update_provider(&self, mut provider: Provider) -> Result<Provider> {
        let mut providers = write(&self.providers);
        match providers.get_mut(&provider.id) {
            Some(slot) => {
                provider.updated_at = Utc::now();
                *slot = provider.clone();
                Ok(provider)
            }
            None => Err(Error::NotFound(format!("Provider {} not found", provider.id))),
        }
    }

    async fn delete_provider(&self, id: &ProviderId) -> Result<()> {
        write(&self.providers)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Provider {} not found", id)))
    }
}
