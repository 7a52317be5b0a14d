//! Credential vault for FleetSync.
//!
//! This module provides:
//! - Authenticated encryption using XChaCha20-Poly1305
//! - A server master key with per-tenant key derivation
//! - Optional Argon2id derivation of the master key from a passphrase
//! - [`CredentialVault`], which seals provider credential JSON for storage
//!
//! # Security Guarantees
//! - All key material is zeroized on drop
//! - No plaintext credentials or key material are ever logged
//! - Tampered or foreign ciphertext is rejected before any plaintext is returned

pub mod aead;
pub mod kdf;
pub mod keys;
pub mod vault;

pub use aead::{decrypt, encrypt};
pub use kdf::{derive_key, KdfParams};
pub use keys::{MasterKey, Salt, TenantKey};
pub use vault::CredentialVault;
