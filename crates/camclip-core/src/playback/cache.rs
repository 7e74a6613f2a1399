use crate::{
    capture::ARTIFACT_MIME_TYPE,
    playback::{BlobRegistry, Locator},
    store::SavedVideo,
};

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

/// Owns the lifetime of every playback locator, at most one per video id.
///
/// Callers only ever borrow the locator URL. Dropping the cache revokes
/// everything it still holds.
pub struct PlaybackCache {
    registry: BlobRegistry,
    handles: HashMap<String, Locator>,
}

impl PlaybackCache {
    /// Empty cache minting locators from `registry`.
    pub fn new(registry: BlobRegistry) -> Self {
        Self {
            registry,
            handles: HashMap::new(),
        }
    }

    /// Live locator for `video`, allocating one on first use.
    #[instrument(skip(self, video), fields(video_id = %video.id))]
    pub fn resolve(&mut self, video: &SavedVideo) -> Locator {
        if let Some(locator) = self.handles.get(&video.id)
            && self.registry.is_live(locator)
        {
            return locator.clone();
        }

        let locator = self
            .registry
            .create(video.blob_data.clone(), ARTIFACT_MIME_TYPE);
        self.handles.insert(video.id.clone(), locator.clone());

        debug!(url = locator.url(), "Locator allocated");

        locator
    }

    /// Revoke the locator for `id`. Returns whether one was live.
    pub fn release(&mut self, id: &str) -> bool {
        match self.handles.remove(id) {
            Some(locator) => {
                self.registry.revoke(&locator);
                debug!(video_id = id, "Locator released");
                true
            }
            None => false,
        }
    }

    /// Revoke every locator.
    pub fn release_all(&mut self) {
        let count = self.handles.len();
        for (_, locator) in self.handles.drain() {
            self.registry.revoke(&locator);
        }

        if count > 0 {
            debug!(count, "All locators released");
        }
    }

    /// Release locators whose id is not in `ids`. Returns how many were released.
    pub fn retain<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> usize {
        let keep: HashSet<&str> = ids.into_iter().collect();
        let stale: Vec<String> = self
            .handles
            .keys()
            .filter(|id| !keep.contains(id.as_str()))
            .cloned()
            .collect();

        for id in &stale {
            self.release(id);
        }

        stale.len()
    }

    /// Locator currently held for `id`.
    pub fn locator(&self, id: &str) -> Option<&Locator> {
        self.handles.get(id)
    }

    /// Number of held locators.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no locator is held.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Registry this cache mints from.
    pub fn registry(&self) -> &BlobRegistry {
        &self.registry
    }
}

impl Drop for PlaybackCache {
    fn drop(&mut self) {
        self.release_all();
    }
}
