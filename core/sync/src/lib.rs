//! FleetSync provider sync.
//!
//! One sync of one provider runs in three steps:
//! - the [`SyncOrchestrator`] decrypts credentials, resolves the vendor
//!   adapter and fetches assets, returning failures as values
//! - the [`Reconciler`] merges each asset into the trailer store
//! - the [`SyncService`] records the outcome on the provider
//!
//! There is no scheduler and no retry; each call runs to completion.

pub mod orchestrator;
pub mod reconcile;
pub mod service;
pub mod status;

#[cfg(test)]
mod testing;

pub use orchestrator::{ConnectionTest, SyncOrchestrator, SyncOutcome, TaggedAsset};
pub use reconcile::{AssetFailure, ReconcileSummary, Reconciler};
pub use service::{NewProvider, ProviderUpdate, SyncService};
pub use status::{display_name, map_status};
