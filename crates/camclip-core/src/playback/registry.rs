use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::debug;
use uuid::Uuid;

/// A revocable reference to one registered payload.
///
/// Only the [`BlobRegistry`] that minted it can resolve it, and only until
/// it is revoked. Cloning shares the reference, not the lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    key: Uuid,
    url: String,
}

impl Locator {
    /// Registry key.
    pub fn key(&self) -> Uuid {
        self.key
    }

    /// Full URL a playback surface can open.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// A registered payload.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Raw bytes.
    pub bytes: Arc<Vec<u8>>,
    /// Media type served with the bytes.
    pub mime_type: &'static str,
}

/// Process-local table of revocable blobs, addressed as `<base>/<uuid>`.
///
/// Cheap to clone; clones share the table. The playback server reads from
/// it, the [`crate::PlaybackCache`] writes to it.
#[derive(Clone)]
pub struct BlobRegistry {
    base_url: String,
    blobs: Arc<RwLock<HashMap<Uuid, Blob>>>,
}

impl BlobRegistry {
    /// Registry minting URLs under `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            blobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// URL prefix of every minted locator.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register `bytes` under a fresh key.
    pub fn create(&self, bytes: Vec<u8>, mime_type: &'static str) -> Locator {
        let key = Uuid::new_v4();
        let size = bytes.len();

        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key,
                Blob {
                    bytes: Arc::new(bytes),
                    mime_type,
                },
            );

        debug!(%key, size, "Blob registered");

        Locator {
            key,
            url: format!("{}/{}", self.base_url, key),
        }
    }

    /// Drop the payload behind `locator`. Returns whether it was live.
    pub fn revoke(&self, locator: &Locator) -> bool {
        let removed = self
            .blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&locator.key)
            .is_some();

        if removed {
            debug!(key = %locator.key, "Blob revoked");
        }

        removed
    }

    /// Payload for `key`, `None` once revoked.
    pub fn fetch(&self, key: Uuid) -> Option<Blob> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Whether `locator` still resolves.
    pub fn is_live(&self, locator: &Locator) -> bool {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&locator.key)
    }

    /// Number of live blobs.
    pub fn live_count(&self) -> usize {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
