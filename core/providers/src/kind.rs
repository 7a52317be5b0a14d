//! The closed set of supported GPS vendors.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use fleetsync_common::Error;

/// A supported GPS vendor.
///
/// Parsing is case-insensitive; an unknown name is the only way to get
/// `Error::UnsupportedProvider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Spireon,
    SkyBitz,
    Samsara,
}

impl ProviderKind {
    /// All supported vendors.
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Spireon,
        ProviderKind::SkyBitz,
        ProviderKind::Samsara,
    ];

    /// Lowercase type string as stored and sent over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Spireon => "spireon",
            ProviderKind::SkyBitz => "skybitz",
            ProviderKind::Samsara => "samsara",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::UnsupportedProvider(s.to_string()))
    }
}

impl Serialize for ProviderKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
