//! Secure refresh-token storage.
//!
//! The persisted refresh token is the sole cross-restart source of truth for
//! the session. Readers must treat a missing or corrupt value as "no
//! session" — `read` returns `None` instead of failing — so a damaged
//! keychain entry can never wedge startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Default keychain service identifier for the session subsystem.
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "Rewear.session";
const REFRESH_TOKEN_ACCOUNT: &str = "refreshToken";

/// Error type for secure storage writes.
///
/// Reads never fail; see [`TokenStorage::read`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("keychain access failed: {0}")]
    Keychain(String),
}

/// Contract for persisting the refresh token.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Persist the refresh token, replacing any previous value.
    async fn store(&self, token: &str) -> Result<(), StorageError>;

    /// Read the stored refresh token. A missing or corrupt value reads as
    /// `None`; this never fails.
    async fn read(&self) -> Option<String>;

    /// Remove the stored refresh token. Idempotent.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Envelope written around the token so reads can reject foreign values.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredToken {
    token: String,
    stored_at: DateTime<Utc>,
}

fn encode_envelope(token: &str) -> Result<String, StorageError> {
    serde_json::to_string(&StoredToken { token: token.to_string(), stored_at: Utc::now() })
        .map_err(|e| StorageError::Keychain(format!("failed to encode token envelope: {e}")))
}

fn decode_envelope(raw: &str) -> Option<String> {
    match serde_json::from_str::<StoredToken>(raw) {
        Ok(envelope) if !envelope.token.is_empty() => Some(envelope.token),
        Ok(_) => None,
        Err(error) => {
            warn!(%error, "stored refresh token envelope is corrupt, treating as absent");
            None
        }
    }
}

/// Platform keychain storage via the `keyring` crate (macOS Keychain,
/// Windows Credential Manager, Linux Secret Service).
pub struct KeychainTokenStorage {
    service_name: String,
}

impl KeychainTokenStorage {
    /// Create storage under the default service name.
    #[must_use]
    pub fn new() -> Self {
        Self::with_service(DEFAULT_KEYCHAIN_SERVICE)
    }

    /// Create storage under a custom keychain service name.
    pub fn with_service(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    fn entry(&self) -> Result<Entry, StorageError> {
        Entry::new(&self.service_name, REFRESH_TOKEN_ACCOUNT)
            .map_err(|e| StorageError::Keychain(format!("failed to open keychain entry: {e}")))
    }
}

impl Default for KeychainTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStorage for KeychainTokenStorage {
    async fn store(&self, token: &str) -> Result<(), StorageError> {
        let payload = encode_envelope(token)?;
        self.entry()?
            .set_password(&payload)
            .map_err(|e| StorageError::Keychain(format!("failed to store refresh token: {e}")))?;
        debug!(service = %self.service_name, "stored refresh token securely");
        Ok(())
    }

    async fn read(&self) -> Option<String> {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%error, "failed to open keychain entry, treating as no session");
                return None;
            }
        };

        match entry.get_password() {
            Ok(raw) => decode_envelope(&raw),
            Err(keyring::Error::NoEntry) => None,
            Err(error) => {
                warn!(%error, "failed to read refresh token, treating as no session");
                None
            }
        }
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let entry = self.entry()?;
        if let Err(error) = entry.delete_credential() {
            if !matches!(error, keyring::Error::NoEntry) {
                return Err(StorageError::Keychain(format!(
                    "failed to clear refresh token: {error}"
                )));
            }
        }
        debug!(service = %self.service_name, "cleared refresh token from secure storage");
        Ok(())
    }
}

#[async_trait]
impl<T: TokenStorage + ?Sized> TokenStorage for std::sync::Arc<T> {
    async fn store(&self, token: &str) -> Result<(), StorageError> {
        (**self).store(token).await
    }

    async fn read(&self) -> Option<String> {
        (**self).read().await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        (**self).clear().await
    }
}

/// In-memory storage for tests and headless environments.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    value: tokio::sync::Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a token, as after a previous login.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { value: tokio::sync::Mutex::new(Some(token.into())) }
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn store(&self, token: &str) -> Result<(), StorageError> {
        *self.value.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn read(&self) -> Option<String> {
        self.value.lock().await.clone()
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.value.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for storage envelopes and the in-memory backend. Keychain
    //! access itself is platform-dependent and exercised manually.
    use super::*;

    /// Validates the envelope round-trip and its wire field names.
    #[test]
    fn envelope_roundtrip() {
        let encoded = encode_envelope("refresh-1").unwrap();
        assert!(encoded.contains("\"token\":\"refresh-1\""));
        assert!(encoded.contains("storedAt"));
        assert_eq!(decode_envelope(&encoded).as_deref(), Some("refresh-1"));
    }

    /// Validates corrupt and empty envelopes read as absent, never failing.
    #[test]
    fn corrupt_envelope_reads_as_absent() {
        assert_eq!(decode_envelope("not json"), None);
        assert_eq!(decode_envelope("{\"other\":1}"), None);
        assert_eq!(decode_envelope("{\"token\":\"\",\"storedAt\":\"2026-01-01T00:00:00Z\"}"), None);
    }

    /// Validates store/read/clear on the in-memory backend and clear
    /// idempotency.
    #[tokio::test]
    async fn memory_storage_lifecycle() {
        let storage = MemoryTokenStorage::new();
        assert_eq!(storage.read().await, None);

        storage.store("refresh-1").await.unwrap();
        assert_eq!(storage.read().await.as_deref(), Some("refresh-1"));

        storage.clear().await.unwrap();
        storage.clear().await.unwrap();
        assert_eq!(storage.read().await, None);
    }
}
