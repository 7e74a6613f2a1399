//! What the tray shows for a given application snapshot.

use crate::TrayIconState;

use camclip_core::{AppSnapshot, QualityTier, RecorderState, format_duration, selectors};

const APP_NAME: &str = "CamClip";

/// Everything the main thread needs to redraw the tray.
#[derive(Debug, Clone, PartialEq)]
pub struct TrayView {
    /// Icon to display.
    pub state: TrayIconState,
    /// Hover text.
    pub tooltip: String,
    /// Checked quality entry (None = Auto).
    pub pinned: Option<QualityTier>,
    /// Enables the clip entries.
    pub has_clips: bool,
    /// Enables "Close player".
    pub playing: bool,
}

impl TrayView {
    /// Derive the tray view from a published snapshot.
    pub fn from_snapshot(snapshot: &AppSnapshot) -> Self {
        let status = match &snapshot.recorder_state {
            RecorderState::Initializing | RecorderState::Ready => "Starting camera...".to_string(),
            RecorderState::Recording => format!(
                "Recording {} at {}",
                format_duration(selectors::recording_time(snapshot)),
                selectors::current_quality(snapshot).label()
            ),
            RecorderState::Finalizing => "Saving...".to_string(),
            RecorderState::Idle | RecorderState::Errored { .. } => {
                match selectors::videos(snapshot).len() {
                    0 => "Ready".to_string(),
                    1 => "Ready (1 clip)".to_string(),
                    n => format!("Ready ({n} clips)"),
                }
            }
        };

        let mut tooltip = format!("{APP_NAME} - {status}");
        if let Some(mbps) = selectors::bandwidth(snapshot) {
            tooltip.push_str(&format!("\nMeasured speed: {mbps:.1} Mbps"));
        }
        if let Some(message) = &snapshot.last_message {
            tooltip.push('\n');
            tooltip.push_str(message);
        }

        Self {
            state: TrayIconState::from(&snapshot.recorder_state),
            tooltip,
            pinned: snapshot.pinned_quality,
            has_clips: selectors::has_recorded_videos(snapshot),
            playing: snapshot.selected_video.is_some(),
        }
    }
}
