use camclip_core::RecorderState;

/// Tray icon states corresponding to the recorder phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayIconState {
    /// Ready to start recording.
    Idle,
    /// Camera open, clip being captured.
    Recording,
    /// Assembling and storing the clip.
    Saving,
}

impl From<&RecorderState> for TrayIconState {
    fn from(state: &RecorderState) -> Self {
        match state {
            RecorderState::Initializing | RecorderState::Ready | RecorderState::Recording => {
                TrayIconState::Recording
            }
            RecorderState::Finalizing => TrayIconState::Saving,
            RecorderState::Idle | RecorderState::Errored { .. } => TrayIconState::Idle,
        }
    }
}
