//! Trailer and provider persistence for FleetSync.
//!
//! Two async traits, [`TrailerStore`] and [`ProviderStore`], with an
//! in-memory implementation for tests and a SQLite one for deployment.
//! Both enforce the trailer uniqueness invariants and report violations
//! as `Error::Conflict`.

pub mod memory;
pub mod models;
mod rows;
pub mod sqlite;
pub mod store;

#[cfg(test)]
mod testing;

pub use memory::MemoryStore;
pub use models::{NewTrailer, Provider, Trailer, TrailerStatus};
pub use sqlite::SqliteStore;
pub use store::{ProviderStore, Store, TrailerStore};
