use crate::{
    StoreError,
    library::VideoSummary,
    playback::{BlobRegistry, Locator, PlaybackCache},
    store::{SavedVideo, VideoStore},
};

use tracing::{info, instrument, warn};

/// Authoritative in-memory list of stored clips plus their playback locators.
///
/// Every list change is mirrored into the [`PlaybackCache`], so locators for
/// clips that left the list are revoked no matter which path removed them.
pub struct VideoLibrary {
    store: VideoStore,
    cache: PlaybackCache,
    videos: Vec<SavedVideo>,
    selected: Option<String>,
}

impl VideoLibrary {
    /// Empty library over `store`, minting locators from `registry`.
    pub fn new(store: VideoStore, registry: BlobRegistry) -> Self {
        Self {
            store,
            cache: PlaybackCache::new(registry),
            videos: Vec::new(),
            selected: None,
        }
    }

    /// Replace the list with the store contents.
    ///
    /// # Errors
    ///
    /// The store failure. The list is left empty in that case.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), StoreError> {
        let result = self.store.get_all().await;
        let loaded = match result {
            Ok(videos) => videos,
            Err(e) => {
                warn!(error = ?e, "Loading videos failed, showing an empty list");
                self.videos.clear();
                self.sync();
                return Err(e);
            }
        };

        info!(count = loaded.len(), "Video list loaded");
        self.videos = loaded;
        self.sync();

        Ok(())
    }

    /// Append a clip that was already persisted.
    pub fn insert(&mut self, video: SavedVideo) {
        self.videos.retain(|v| v.id != video.id);
        self.videos.push(video);
    }

    /// Revoke the clip's locator, then delete it from the store and the list.
    ///
    /// # Errors
    ///
    /// The store failure; the clip stays listed but its locator is gone.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.cache.release(id);
        self.store.delete(id).await?;

        self.videos.retain(|v| v.id != id);
        self.sync();

        info!(video_id = id, "Video removed");

        Ok(())
    }

    /// Revoke every locator and empty the store and the list.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) -> Result<(), StoreError> {
        self.cache.release_all();
        self.store.clear().await?;

        self.videos.clear();
        self.selected = None;

        Ok(())
    }

    /// Select `id` for playback and return its locator.
    pub fn play(&mut self, id: &str) -> Option<Locator> {
        let video = self.videos.iter().find(|v| v.id == id)?;
        let locator = self.cache.resolve(video);
        self.selected = Some(id.to_string());

        Some(locator)
    }

    /// Deselect the playing clip. Its locator stays cached.
    pub fn close(&mut self) {
        self.selected = None;
    }

    /// Revoke every locator without touching the store.
    pub fn release_all(&mut self) {
        self.cache.release_all();
        self.selected = None;
    }

    /// Clips in store order.
    pub fn videos(&self) -> &[SavedVideo] {
        &self.videos
    }

    /// Payload-free view of the list.
    pub fn summaries(&self) -> Vec<VideoSummary> {
        self.videos.iter().map(VideoSummary::from).collect()
    }

    /// Id of the clip open in the player.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Locator of the clip open in the player.
    pub fn selected_locator(&self) -> Option<&Locator> {
        self.selected.as_deref().and_then(|id| self.cache.locator(id))
    }

    /// Playback locators held for the list.
    pub fn cache(&self) -> &PlaybackCache {
        &self.cache
    }

    fn sync(&mut self) {
        let released = self.cache.retain(self.videos.iter().map(|v| v.id.as_str()));
        if released > 0 {
            info!(released, "Released locators for removed videos");
        }

        if let Some(id) = self.selected.as_deref()
            && !self.videos.iter().any(|v| v.id == id)
        {
            self.selected = None;
        }
    }
}
