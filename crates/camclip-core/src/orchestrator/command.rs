use crate::quality::QualityTier;

/// Commands accepted by the [`crate::Orchestrator`]. All are fire-and-forget;
/// outcomes show up in the next [`crate::AppSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a recording when idle, stop it when recording.
    StartOrStopRecording,
    /// Pin a tier, or `None` for bandwidth-driven selection.
    SelectQuality(Option<QualityTier>),
    /// Delete a stored clip.
    DeleteVideo(String),
    /// Open a stored clip in the player.
    PlayVideo(String),
    /// Close the player.
    CloseVideo,
    /// Delete every stored clip.
    ClearVideos,
    /// Reload the list from the store.
    LoadVideos,
    /// Tear everything down and stop the loop.
    Shutdown,
}
