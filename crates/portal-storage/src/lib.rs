//! Origin-scoped credential persistence for the portal session.
//!
//! This crate provides:
//! - The `OriginStorage` key/value abstraction with in-memory and file backends
//! - The persisted credential model (`TokenBundle`, `ProviderDescriptor`)
//! - `CredentialStore`, the single owner of the active session's state

mod credentials;
mod file;
mod keys;
mod memory;
mod store;
mod traits;

pub use credentials::{OidcProvider, ProviderDescriptor, TokenBundle};
pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use store::{CredentialStore, StoredSession};
pub use traits::OriginStorage;

use std::path::Path;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Open the persistent backend for an origin's store file.
pub fn open_origin_storage(path: &Path) -> StorageResult<Box<dyn OriginStorage>> {
    Ok(Box::new(FileStorage::open(path)?))
}

/// Open a credential store persisted at `path`.
pub fn open_credential_store(path: &Path) -> StorageResult<CredentialStore> {
    Ok(CredentialStore::new(open_origin_storage(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.set("test_key", "test_value").unwrap();
        assert_eq!(storage.get("test_key").unwrap(), Some("test_value".to_string()));

        assert!(storage.has("test_key").unwrap());
        assert!(!storage.has("nonexistent").unwrap());

        assert!(storage.delete("test_key").unwrap());
        assert!(!storage.delete("test_key").unwrap());
        assert_eq!(storage.get("test_key").unwrap(), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_credential_store_persists_across_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("origin.json");
        let provider = ProviderDescriptor::Sms {
            client_id: "web".to_string(),
        };
        let bundle = TokenBundle::new("AT1", "RT1");

        let store = open_credential_store(&path).unwrap();
        store.save(&bundle, &provider).unwrap();
        drop(store);

        let reloaded = open_credential_store(&path).unwrap();
        let session = reloaded.load().unwrap().unwrap();
        assert_eq!(session.bundle, bundle);
        assert_eq!(session.provider, provider);

        reloaded.clear().unwrap();
        drop(reloaded);

        let reloaded = open_credential_store(&path).unwrap();
        assert!(reloaded.load().unwrap().is_none());
    }

    #[test]
    fn test_storage_keys_constants() {
        let keys = vec![
            StorageKeys::TOKEN_BUNDLE,
            StorageKeys::PROVIDER,
            StorageKeys::API_BASE_URL,
            StorageKeys::LAST_VISITED_URL,
        ];
        assert!(keys.iter().all(|k| !k.is_empty()));

        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "Storage keys must be unique");
        assert!(!StorageKeys::SESSION_SCOPED.contains(&StorageKeys::LAST_VISITED_URL));
    }
}
