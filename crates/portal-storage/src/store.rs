//! Credential store: the single owner of persisted session state.
//!
//! Every operation runs under one lock, so a `load` never observes a bundle
//! without its provider (or the reverse). A generation counter is bumped on
//! every `save` and `clear`; writers that started from an older generation
//! can use [`CredentialStore::replace_bundle_if`] to avoid resurrecting a
//! session that was cleared underneath them.

use crate::{OriginStorage, ProviderDescriptor, StorageKeys, StorageResult, TokenBundle};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// A session as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub bundle: TokenBundle,
    pub provider: ProviderDescriptor,
    /// Store generation at the time of the read
    pub generation: u64,
}

struct StoreInner {
    storage: Box<dyn OriginStorage>,
    generation: u64,
}

/// Origin-scoped credential store.
pub struct CredentialStore {
    inner: Mutex<StoreInner>,
}

impl CredentialStore {
    /// Create a store over the given backend.
    pub fn new(storage: Box<dyn OriginStorage>) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                storage,
                generation: 0,
            }),
        }
    }

    /// Persist a freshly issued session. Returns the new generation.
    pub fn save(&self, bundle: &TokenBundle, provider: &ProviderDescriptor) -> StorageResult<u64> {
        let bundle_json = serde_json::to_string(bundle)?;
        let provider_json = serde_json::to_string(provider)?;

        let mut inner = self.inner.lock();
        let written = inner.storage.set_many(&[
            (StorageKeys::PROVIDER, provider_json.as_str()),
            (StorageKeys::TOKEN_BUNDLE, bundle_json.as_str()),
        ]);
        if let Err(e) = written {
            // Never leave one half of the pair behind
            if let Err(rollback) = inner
                .storage
                .delete_many(&[StorageKeys::PROVIDER, StorageKeys::TOKEN_BUNDLE])
            {
                warn!(error = %rollback, "Failed to roll back partial session write");
            }
            inner.generation += 1;
            return Err(e);
        }

        inner.generation += 1;
        info!(
            provider = %provider.provider_key(),
            generation = inner.generation,
            "Session saved"
        );
        Ok(inner.generation)
    }

    /// Read the current session, if any.
    ///
    /// A half-present or unreadable pair is treated as no session and removed.
    pub fn load(&self) -> StorageResult<Option<StoredSession>> {
        let mut inner = self.inner.lock();
        let bundle_json = inner.storage.get(StorageKeys::TOKEN_BUNDLE)?;
        let provider_json = inner.storage.get(StorageKeys::PROVIDER)?;

        let (bundle_json, provider_json) = match (bundle_json, provider_json) {
            (Some(b), Some(p)) => (b, p),
            (None, None) => return Ok(None),
            _ => {
                warn!("Token bundle and provider out of step, clearing session");
                Self::clear_locked(&mut inner)?;
                return Ok(None);
            }
        };

        let bundle = serde_json::from_str::<TokenBundle>(&bundle_json);
        let provider = serde_json::from_str::<ProviderDescriptor>(&provider_json);
        match (bundle, provider) {
            (Ok(bundle), Ok(provider)) => Ok(Some(StoredSession {
                bundle,
                provider,
                generation: inner.generation,
            })),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Stored session is unreadable, clearing session");
                Self::clear_locked(&mut inner)?;
                Ok(None)
            }
        }
    }

    /// Whether a session is present.
    pub fn has_session(&self) -> StorageResult<bool> {
        Ok(self.load()?.is_some())
    }

    /// Remove the session and every session-scoped cached value.
    pub fn clear(&self) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        Self::clear_locked(&mut inner)?;
        info!(generation = inner.generation, "Session cleared");
        Ok(())
    }

    fn clear_locked(inner: &mut StoreInner) -> StorageResult<()> {
        // Bump first so a failed delete still invalidates in-flight writers
        inner.generation += 1;
        inner.storage.delete_many(&StorageKeys::SESSION_SCOPED)
    }

    /// Replace the token bundle only if the store is still at `generation`.
    ///
    /// Returns false (and writes nothing) when the session was saved or
    /// cleared since `generation` was read.
    pub fn replace_bundle_if(&self, generation: u64, bundle: &TokenBundle) -> StorageResult<bool> {
        let bundle_json = serde_json::to_string(bundle)?;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(
                expected = generation,
                current = inner.generation,
                "Discarding stale bundle write"
            );
            return Ok(false);
        }
        if !inner.storage.has(StorageKeys::PROVIDER)? {
            debug!("Discarding bundle write, no session present");
            return Ok(false);
        }

        inner.storage.set(StorageKeys::TOKEN_BUNDLE, &bundle_json)?;
        inner.generation += 1;
        Ok(true)
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Cache the backend API base URL resolved at startup.
    pub fn cache_api_base_url(&self, url: &str) -> StorageResult<()> {
        self.inner.lock().storage.set(StorageKeys::API_BASE_URL, url)
    }

    pub fn api_base_url(&self) -> StorageResult<Option<String>> {
        self.inner.lock().storage.get(StorageKeys::API_BASE_URL)
    }

    /// Remember the page the user is on.
    pub fn set_last_visited(&self, url: &str) -> StorageResult<()> {
        self.inner.lock().storage.set(StorageKeys::LAST_VISITED_URL, url)
    }

    pub fn last_visited(&self) -> StorageResult<Option<String>> {
        self.inner.lock().storage.get(StorageKeys::LAST_VISITED_URL)
    }

    /// Read and remove the remembered page.
    pub fn take_last_visited(&self) -> StorageResult<Option<String>> {
        let inner = self.inner.lock();
        let url = inner.storage.get(StorageKeys::LAST_VISITED_URL)?;
        if url.is_some() {
            inner.storage.delete(StorageKeys::LAST_VISITED_URL)?;
        }
        Ok(url)
    }
}
