//! GPS provider abstraction for FleetSync.
//!
//! Three vendor APIs (Spireon, SkyBitz, Samsara) are normalized into one
//! [`Asset`] model behind the [`GpsProvider`] trait. The set of vendors is
//! closed: [`ProviderKind`] names them and [`ProviderFactory`] hands out a
//! [`ProviderAdapter`] that dispatches with a `match`.
//!
//! # Design Principles
//! - Vendor isolation: pagination, auth schemes and field names stay inside each adapter
//! - Tolerant decoding: optional vendor fields become `None`, never a failed batch
//! - Unified error semantics: every adapter reports vendor failures the same way

mod de;

pub mod credentials;
pub mod factory;
pub mod http;
pub mod kind;
pub mod model;
pub mod provider;
pub mod samsara;
pub mod skybitz;
pub mod spireon;

pub use credentials::{SamsaraCredentials, SkyBitzCredentials, SpireonCredentials};
pub use factory::{ProviderAdapter, ProviderFactory};
pub use http::{HttpSettings, ProviderEndpoints};
pub use kind::ProviderKind;
pub use model::{Asset, AssetLocation, ConnectionStatus, StatusReport};
pub use provider::GpsProvider;
pub use samsara::SamsaraProvider;
pub use skybitz::SkyBitzProvider;
pub use spireon::SpireonProvider;
