//! Common types shared across the FleetSync crates.
//!
//! This module provides the error taxonomy of the GPS sync subsystem, the
//! identifier newtypes that scope every record to a company and tenant, and
//! a small TTL cache owned by whoever needs one.

pub mod cache;
pub mod error;
pub mod types;

pub use cache::TtlCache;
pub use error::{Error, Result};
pub use types::{CompanyId, ProviderId, SensitiveBytes, TenantId, TrailerId};
