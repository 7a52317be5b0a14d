//! Server configuration read from the environment.

use serde::{Serialize, Serializer};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use fleetsync_common::{Error, Result};
use fleetsync_crypto::{derive_key, KdfParams, MasterKey, Salt};
use fleetsync_providers::{HttpSettings, ProviderEndpoints};

pub const ENV_BIND: &str = "FLEETSYNC_BIND";
pub const ENV_DATABASE: &str = "FLEETSYNC_DATABASE";
pub const ENV_VAULT_KEY: &str = "FLEETSYNC_VAULT_KEY";
pub const ENV_VAULT_PASSPHRASE: &str = "FLEETSYNC_VAULT_PASSPHRASE";
pub const ENV_VAULT_SALT: &str = "FLEETSYNC_VAULT_SALT";
pub const ENV_HTTP_TIMEOUT: &str = "FLEETSYNC_HTTP_TIMEOUT_SECS";
pub const ENV_CACHE_TTL: &str = "FLEETSYNC_STATUS_CACHE_TTL_SECS";
pub const ENV_SPIREON_URL: &str = "FLEETSYNC_SPIREON_URL";
pub const ENV_SKYBITZ_URL: &str = "FLEETSYNC_SKYBITZ_URL";
pub const ENV_SAMSARA_URL: &str = "FLEETSYNC_SAMSARA_URL";

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE: &str = "fleetsync.db";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Database path that selects a throwaway in-memory SQLite store.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Where the credential master key comes from.
#[derive(Clone)]
pub enum VaultSecret {
    /// Base64 of the raw 32-byte key.
    Key(String),
    /// Passphrase run through Argon2id with a base64 salt.
    Passphrase { passphrase: String, salt: String },
}

impl VaultSecret {
    fn label(&self) -> &'static str {
        match self {
            VaultSecret::Key(_) => "key",
            VaultSecret::Passphrase { .. } => "passphrase",
        }
    }
}

impl fmt::Debug for VaultSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultSecret::{}([REDACTED])", self.label())
    }
}

fn redact<S: Serializer>(secret: &VaultSecret, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("<redacted {}>", secret.label()))
}

/// Everything the server needs to start.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub database: String,
    #[serde(serialize_with = "redact")]
    pub vault: VaultSecret,
    pub kdf: KdfParams,
    pub http_timeout_secs: u64,
    pub status_cache_ttl_secs: u64,
    pub spireon_url: String,
    pub skybitz_url: String,
    pub samsara_url: String,
}

impl AppConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup. Blank values count as unset.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if no key material is configured, or a value
    ///   does not parse
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let vault = match (get(ENV_VAULT_KEY), get(ENV_VAULT_PASSPHRASE), get(ENV_VAULT_SALT)) {
            (Some(key), _, _) => VaultSecret::Key(key),
            (None, Some(passphrase), Some(salt)) => VaultSecret::Passphrase { passphrase, salt },
            (None, Some(_), None) => {
                return Err(Error::InvalidInput(format!(
                    "{} requires {}",
                    ENV_VAULT_PASSPHRASE, ENV_VAULT_SALT
                )))
            }
            (None, None, _) => {
                return Err(Error::InvalidInput(format!(
                    "No vault key configured: set {} or {} and {}",
                    ENV_VAULT_KEY, ENV_VAULT_PASSPHRASE, ENV_VAULT_SALT
                )))
            }
        };

        let bind = get(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind
            .parse::<SocketAddr>()
            .map_err(|e| Error::InvalidInput(format!("{} '{}' is invalid: {}", ENV_BIND, bind, e)))?;

        let defaults = ProviderEndpoints::default();
        Ok(Self {
            bind,
            database: get(ENV_DATABASE).unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            vault,
            kdf: KdfParams::server(),
            http_timeout_secs: seconds(ENV_HTTP_TIMEOUT, get(ENV_HTTP_TIMEOUT), DEFAULT_HTTP_TIMEOUT_SECS)?,
            status_cache_ttl_secs: seconds(ENV_CACHE_TTL, get(ENV_CACHE_TTL), DEFAULT_CACHE_TTL_SECS)?,
            spireon_url: get(ENV_SPIREON_URL).unwrap_or(defaults.spireon),
            skybitz_url: get(ENV_SKYBITZ_URL).unwrap_or(defaults.skybitz),
            samsara_url: get(ENV_SAMSARA_URL).unwrap_or(defaults.samsara),
        })
    }

    /// Resolve the master key. Passphrases are stretched with `self.kdf`.
    pub fn master_key(&self) -> Result<MasterKey> {
        match &self.vault {
            VaultSecret::Key(encoded) => MasterKey::from_base64(encoded),
            VaultSecret::Passphrase { passphrase, salt } => {
                let salt = Salt::from_base64(salt)?;
                derive_key(passphrase.as_bytes(), &salt, &self.kdf)
            }
        }
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.http_timeout_secs),
            ..HttpSettings::default()
        }
    }

    pub fn endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            spireon: self.spireon_url.clone(),
            skybitz: self.skybitz_url.clone(),
            samsara: self.samsara_url.clone(),
        }
    }

    pub fn status_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.status_cache_ttl_secs)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY_DATABASE
    }
}

fn seconds(name: &str, raw: Option<String>, default: u64) -> Result<u64> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::InvalidInput(format!("{} must be a whole number of seconds", name))),
        None => Ok(default),
    }
}
