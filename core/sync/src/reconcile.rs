//! Merging vendor assets into stored trailers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use fleetsync_common::Result;
use fleetsync_store::{NewTrailer, TrailerStatus, TrailerStore};

use crate::orchestrator::TaggedAsset;
use crate::status::{display_name, map_status};

/// An asset that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFailure {
    pub external_id: String,
    pub error: String,
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub created_count: usize,
    pub updated_count: usize,
    pub failed_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AssetFailure>,
}

enum Change {
    Created,
    Updated,
}

/// Writes tagged assets to the trailer store, one asset at a time.
pub struct Reconciler<S: TrailerStore + ?Sized> {
    store: Arc<S>,
}

impl<S: TrailerStore + ?Sized> Reconciler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create or update a trailer for every asset.
    ///
    /// A failed write skips that asset only; it is logged, counted and
    /// reported in `failures`.
    pub async fn reconcile(&self, assets: &[TaggedAsset]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let now = Utc::now();

        for tagged in assets {
            match self.apply(tagged, now).await {
                Ok(Change::Created) => summary.created_count += 1,
                Ok(Change::Updated) => summary.updated_count += 1,
                Err(e) => {
                    warn!(
                        external_id = %tagged.asset.external_id,
                        provider = %tagged.provider_id,
                        "Skipping asset: {}",
                        e
                    );
                    summary.failed_count += 1;
                    summary.failures.push(AssetFailure {
                        external_id: tagged.asset.external_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            created = summary.created_count,
            updated = summary.updated_count,
            failed = summary.failed_count,
            "Reconciliation finished"
        );
        summary
    }

    async fn apply(&self, tagged: &TaggedAsset, now: DateTime<Utc>) -> Result<Change> {
        let asset = &tagged.asset;
        let gps_status = map_status(asset.raw_status.as_deref());

        let existing = self
            .store
            .find_by_external_id(&tagged.company_id, &asset.external_id)
            .await?;

        match existing {
            Some(mut trailer) => {
                trailer.vin = asset.vin.clone();
                trailer.make = asset.make.clone();
                trailer.model = asset.model.clone();
                trailer.year = asset.year;
                trailer.plate = asset.plate.clone();
                if trailer.manual_location_override {
                    debug!(trailer = %trailer.id, "Location pinned, not overwriting");
                } else {
                    match &asset.location {
                        Some(location) => trailer.apply_location(location),
                        None => trailer.clear_location(),
                    }
                }
                trailer.gps_status = gps_status;
                trailer.last_sync = Some(now);

                debug!(trailer = %trailer.id, external_id = %asset.external_id, "Updating trailer");
                self.store.update(trailer).await?;
                Ok(Change::Updated)
            }
            None => {
                let new = NewTrailer {
                    external_id: asset.external_id.clone(),
                    company_id: tagged.company_id.clone(),
                    tenant_id: tagged.tenant_id.clone(),
                    provider_id: tagged.provider_id.clone(),
                    unit_number: display_name(&asset.name, &asset.external_id),
                    vin: asset.vin.clone(),
                    make: asset.make.clone(),
                    model: asset.model.clone(),
                    year: asset.year,
                    plate: asset.plate.clone(),
                    location: asset.location.clone(),
                    last_sync: Some(now),
                    gps_status,
                    gps_enabled: true,
                    status: TrailerStatus::Available,
                    manual_location_override: false,
                };

                debug!(external_id = %asset.external_id, unit = %new.unit_number, "Creating trailer");
                self.store.create(new).await?;
                Ok(Change::Created)
            }
        }
    }
}
