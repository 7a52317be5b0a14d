//! Error types for the GPS sync subsystem.

use thiserror::Error;

/// Top-level error type for FleetSync operations.
///
/// Credential and vendor errors abort the sync of a single provider.
/// Persistence errors raised while reconciling one asset are caught by the
/// reconciler and only skip that asset.
#[derive(Debug, Error)]
pub enum Error {
    /// Stored credentials could not be decrypted or parsed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The provider type string names no known vendor.
    #[error("Unsupported provider type: {0}")]
    UnsupportedProvider(String),

    /// Network, protocol or vendor-side failure.
    #[error("Vendor connection error: {0}")]
    VendorConnection(String),

    /// The vendor rejected the credentials.
    #[error("Vendor authentication failed: {0}")]
    VendorAuthentication(String),

    /// A store write or read failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A store uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from talking to a vendor API.
    pub fn is_vendor(&self) -> bool {
        matches!(
            self,
            Error::VendorConnection(_) | Error::VendorAuthentication(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::VendorConnection("timeout".into()).is_vendor());
        assert!(Error::VendorAuthentication("401".into()).is_vendor());
        assert!(!Error::UnsupportedProvider("geotab".into()).is_vendor());
    }

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedProvider("geotab".to_string());
        assert_eq!(err.to_string(), "Unsupported provider type: geotab");
    }
}
