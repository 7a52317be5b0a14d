//! Credential vault: seals provider credential JSON for storage.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use std::fmt;

use crate::aead;
use crate::keys::MasterKey;
use fleetsync_common::{Error, Result, SensitiveBytes, TenantId};

/// Encrypts and decrypts provider credentials with a server-held key.
///
/// Each blob is sealed under the key of the tenant that owns the provider,
/// so a blob copied into another tenant's provider row fails to decrypt.
/// The stored form is base64 of `nonce || ciphertext || tag`.
#[derive(Clone)]
pub struct CredentialVault {
    master: MasterKey,
}

impl CredentialVault {
    /// Create a vault around a master key.
    pub fn new(master: MasterKey) -> Self {
        Self { master }
    }

    /// Encrypt a credential JSON document for a tenant.
    ///
    /// # Postconditions
    /// - Returns base64 text suitable for a `credentials_encrypted` column
    /// - Encrypting the same document twice yields different ciphertexts
    ///
    /// # Errors
    /// - Serialization or encryption failure (`Error::Credential`)
    pub fn encrypt(&self, tenant: &TenantId, credentials: &Value) -> Result<String> {
        let plaintext = SensitiveBytes::new(
            serde_json::to_vec(credentials)
                .map_err(|e| Error::Credential(format!("Cannot serialize credentials: {}", e)))?,
        );

        let key = self.master.derive_tenant_key(tenant);
        let sealed = aead::encrypt(key.as_bytes(), plaintext.as_bytes())?;

        Ok(STANDARD.encode(sealed))
    }

    /// Decrypt a stored credential blob back into JSON.
    ///
    /// # Errors
    /// - `Error::Credential` if the text is not base64, the blob is truncated,
    ///   authentication fails, or the plaintext is not JSON
    pub fn decrypt(&self, tenant: &TenantId, ciphertext: &str) -> Result<Value> {
        let sealed = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| Error::Credential(format!("Stored credentials are not base64: {}", e)))?;

        let key = self.master.derive_tenant_key(tenant);
        let plaintext = SensitiveBytes::new(aead::decrypt(key.as_bytes(), &sealed)?);

        serde_json::from_slice(plaintext.as_bytes())
            .map_err(|e| Error::Credential(format!("Decrypted credentials are not JSON: {}", e)))
    }
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn vault() -> CredentialVault {
        CredentialVault::new(MasterKey::from_bytes([7u8; 32]))
    }

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    #[test]
    fn test_roundtrip_spireon_credentials() {
        let vault = vault();
        let creds = json!({
            "apiKey": "app-token",
            "username": "dispatch@acme.test",
            "password": "hunter2",
            "nspireId": "12345"
        });

        let sealed = vault.encrypt(&tenant("t1"), &creds).unwrap();
        assert!(!sealed.contains("hunter2"));

        let opened = vault.decrypt(&tenant("t1"), &sealed).unwrap();
        assert_eq!(opened, creds);
    }

    #[test]
    fn test_other_tenant_cannot_decrypt() {
        let vault = vault();
        let sealed = vault
            .encrypt(&tenant("t1"), &json!({"apiToken": "x", "apiUrl": "https://api.samsara.com"}))
            .unwrap();

        let result = vault.decrypt(&tenant("t2"), &sealed);
        assert!(matches!(result, Err(Error::Credential(_))));
    }

    #[test]
    fn test_other_master_key_cannot_decrypt() {
        let sealed = vault().encrypt(&tenant("t1"), &json!({"a": 1})).unwrap();
        let other = CredentialVault::new(MasterKey::from_bytes([8u8; 32]));

        assert!(matches!(other.decrypt(&tenant("t1"), &sealed), Err(Error::Credential(_))));
    }

    #[test]
    fn test_corrupted_blob_is_credential_error() {
        let vault = vault();
        let sealed = vault.encrypt(&tenant("t1"), &json!({"username": "u"})).unwrap();

        let mut bytes = STANDARD.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = STANDARD.encode(bytes);

        assert!(matches!(vault.decrypt(&tenant("t1"), &tampered), Err(Error::Credential(_))));
        assert!(matches!(vault.decrypt(&tenant("t1"), "%%%"), Err(Error::Credential(_))));
        assert!(matches!(vault.decrypt(&tenant("t1"), ""), Err(Error::Credential(_))));
    }

    #[test]
    fn test_non_json_plaintext_is_credential_error() {
        let vault = vault();
        let key = vault.master.derive_tenant_key(&tenant("t1"));
        let sealed = STANDARD.encode(aead::encrypt(key.as_bytes(), b"not json").unwrap());

        assert!(matches!(vault.decrypt(&tenant("t1"), &sealed), Err(Error::Credential(_))));
    }

    proptest! {
        #[test]
        fn prop_decrypt_inverts_encrypt(
            fields in prop::collection::hash_map("[a-zA-Z]{1,16}", ".{0,48}", 0..8),
            port in proptest::option::of(0u16..),
        ) {
            let mut doc = serde_json::Map::new();
            for (k, v) in fields {
                doc.insert(k, Value::String(v));
            }
            if let Some(port) = port {
                doc.insert("port".to_string(), json!(port));
            }
            let doc = Value::Object(doc);

            let vault = vault();
            let sealed = vault.encrypt(&tenant("tenant-prop"), &doc).unwrap();
            let opened = vault.decrypt(&tenant("tenant-prop"), &sealed).unwrap();

            prop_assert_eq!(opened, doc);
        }
    }
}
