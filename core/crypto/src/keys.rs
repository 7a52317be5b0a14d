//! Key types with secure memory handling.
//!
//! All key types zeroize their memory on drop to prevent sensitive data
//! from persisting in memory.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::aead::{rand_core::RngCore, OsRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use fleetsync_common::{Error, Result, TenantId};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Server-held master key.
///
/// Never used to encrypt credentials directly: every tenant gets its own
/// key derived from this one.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; KEY_LENGTH],
}

impl MasterKey {
    /// Create a master key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Decode a master key from standard base64.
    ///
    /// # Errors
    /// - Input is not valid base64
    /// - Decoded length is not KEY_LENGTH
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::InvalidInput(format!("Master key is not valid base64: {}", e)))?;

        if decoded.len() != KEY_LENGTH {
            let len = decoded.len();
            decoded.zeroize();
            return Err(Error::InvalidInput(format!(
                "Master key must be {} bytes, got {}",
                KEY_LENGTH, len
            )));
        }

        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { key })
    }

    /// Generate a random master key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Encode as standard base64, for writing into configuration.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.key)
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Derive the credential key of one tenant.
    ///
    /// Uses blake2b over master key, tenant id and a fixed context string.
    pub fn derive_tenant_key(&self, tenant: &TenantId) -> TenantKey {
        use blake2::digest::consts::U32;
        use blake2::{Blake2b, Digest};

        let mut hasher = Blake2b::<U32>::new();
        hasher.update(&self.key);
        hasher.update(tenant.as_str().as_bytes());
        hasher.update(b"tenant-credentials");

        let result = hasher.finalize();
        let mut derived = [0u8; KEY_LENGTH];
        derived.copy_from_slice(&result);
        TenantKey::from_bytes(derived)
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey([REDACTED])")
    }
}

/// Key for encrypting the credentials of a single tenant.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TenantKey {
    key: [u8; KEY_LENGTH],
}

impl TenantKey {
    /// Create a tenant key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantKey([REDACTED])")
    }
}

/// Salt for passphrase key derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salt(pub [u8; 32]);

impl Salt {
    /// Generate a random salt.
    pub fn generate() -> Self {
        let mut salt = [0u8; 32];
        OsRng.fill_bytes(&mut salt);
        Self(salt)
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Decode from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::InvalidInput(format!("Salt is not valid base64: {}", e)))?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|v: Vec<u8>| {
            Error::InvalidInput(format!("Salt must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_tenant_key() {
        let master = MasterKey::from_bytes([1u8; KEY_LENGTH]);
        let tenant = TenantId::new("tenant-a").unwrap();

        let key1 = master.derive_tenant_key(&tenant);
        let key2 = master.derive_tenant_key(&tenant);
        assert_eq!(key1.as_bytes(), key2.as_bytes());

        let other = master.derive_tenant_key(&TenantId::new("tenant-b").unwrap());
        assert_ne!(key1.as_bytes(), other.as_bytes());

        // The tenant key is never the master key itself
        assert_ne!(key1.as_bytes(), master.as_bytes());
    }

    #[test]
    fn test_master_key_base64_roundtrip() {
        let master = MasterKey::generate();
        let encoded = master.to_base64();
        let decoded = MasterKey::from_base64(&encoded).unwrap();

        assert_eq!(master.as_bytes(), decoded.as_bytes());
    }

    #[test]
    fn test_master_key_wrong_length_fails() {
        let encoded = STANDARD.encode([7u8; 16]);
        assert!(MasterKey::from_base64(&encoded).is_err());
        assert!(MasterKey::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_master_key_generate() {
        let key1 = MasterKey::generate();
        let key2 = MasterKey::generate();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_debug_is_redacted() {
        let master = MasterKey::from_bytes([9u8; KEY_LENGTH]);
        assert_eq!(format!("{:?}", master), "MasterKey([REDACTED])");
    }

    #[test]
    fn test_salt_base64_roundtrip() {
        let salt = Salt::generate();
        let decoded = Salt::from_base64(&salt.to_base64()).unwrap();
        assert_eq!(salt.as_bytes(), decoded.as_bytes());

        assert!(Salt::from_base64(&STANDARD.encode([1u8; 8])).is_err());
    }
}
