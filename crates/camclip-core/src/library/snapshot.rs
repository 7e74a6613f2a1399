use crate::{
    quality::{DEFAULT_QUALITY, QualityTier},
    recorder::RecorderState,
    store::SavedVideo,
};

/// Stored clip without its payload, cheap to clone into views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSummary {
    /// Record id.
    pub id: String,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    /// Recorded seconds.
    pub duration: u32,
    /// Recording tier.
    pub quality: QualityTier,
    /// Payload size in bytes.
    pub size_bytes: usize,
}

impl From<&SavedVideo> for VideoSummary {
    fn from(video: &SavedVideo) -> Self {
        Self {
            id: video.id.clone(),
            timestamp: video.timestamp,
            duration: video.duration,
            quality: video.quality,
            size_bytes: video.blob_data.len(),
        }
    }
}

/// Immutable derived state published after every command.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSnapshot {
    /// Stored clips in store order.
    pub videos: Vec<VideoSummary>,
    /// Recorder phase.
    pub recorder_state: RecorderState,
    /// Tier of the open session or the next one.
    pub current_quality: QualityTier,
    /// Manually selected tier.
    pub pinned_quality: Option<QualityTier>,
    /// Last measured throughput in Mbps.
    pub bandwidth: Option<f64>,
    /// Seconds recorded in the open session.
    pub recording_time: u32,
    /// Clip open in the player.
    pub selected_video: Option<String>,
    /// Locator URL of the selected clip.
    pub selected_locator: Option<String>,
    /// Latest notice or failure for the user.
    pub last_message: Option<String>,
}

impl Default for AppSnapshot {
    fn default() -> Self {
        Self {
            videos: Vec::new(),
            recorder_state: RecorderState::Idle,
            current_quality: DEFAULT_QUALITY,
            pinned_quality: None,
            bandwidth: None,
            recording_time: 0,
            selected_video: None,
            selected_locator: None,
            last_message: None,
        }
    }
}

/// Pure views over an [`AppSnapshot`].
pub mod selectors {
    use super::{AppSnapshot, VideoSummary};
    use crate::quality::QualityTier;

    /// Stored clips.
    pub fn videos(snapshot: &AppSnapshot) -> &[VideoSummary] {
        &snapshot.videos
    }

    /// Tier in effect.
    pub fn current_quality(snapshot: &AppSnapshot) -> QualityTier {
        snapshot.current_quality
    }

    /// Last measured throughput.
    pub fn bandwidth(snapshot: &AppSnapshot) -> Option<f64> {
        snapshot.bandwidth
    }

    /// Whether the recorder is capturing.
    pub fn is_recording(snapshot: &AppSnapshot) -> bool {
        snapshot.recorder_state.is_recording()
    }

    /// Seconds recorded so far.
    pub fn recording_time(snapshot: &AppSnapshot) -> u32 {
        snapshot.recording_time
    }

    /// Whether any clip is stored.
    pub fn has_recorded_videos(snapshot: &AppSnapshot) -> bool {
        !snapshot.videos.is_empty()
    }

    /// Clip open in the player.
    pub fn selected_video(snapshot: &AppSnapshot) -> Option<&VideoSummary> {
        let id = snapshot.selected_video.as_deref()?;
        snapshot.videos.iter().find(|v| v.id == id)
    }

    /// Most recently created clip. Ties go to the later one in store order.
    pub fn latest_video(snapshot: &AppSnapshot) -> Option<&VideoSummary> {
        snapshot.videos.iter().max_by_key(|v| v.timestamp)
    }
}
