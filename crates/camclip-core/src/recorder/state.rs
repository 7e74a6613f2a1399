use crate::quality::{BandwidthSample, QualityTier};

use std::fmt;

/// Phase of the recording state machine.
///
/// `Idle -> Initializing -> Ready -> Recording -> Finalizing -> Idle`.
/// `Errored` is entered when an attempt fails and always resolves to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecorderState {
    /// No session open.
    #[default]
    Idle,
    /// Measuring bandwidth and acquiring the device.
    Initializing,
    /// Device and encoder acquired.
    Ready,
    /// Encoder running, timer ticking.
    Recording,
    /// Stopping the encoder and persisting the clip.
    Finalizing,
    /// The last attempt failed.
    Errored {
        /// User-facing explanation.
        message: String,
    },
}

impl RecorderState {
    /// Short lowercase name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::Initializing => "initializing",
            RecorderState::Ready => "ready",
            RecorderState::Recording => "recording",
            RecorderState::Finalizing => "finalizing",
            RecorderState::Errored { .. } => "errored",
        }
    }

    /// Whether the encoder is running.
    pub fn is_recording(&self) -> bool {
        matches!(self, RecorderState::Recording)
    }

    /// Whether a new start would be accepted.
    pub fn is_idle(&self) -> bool {
        matches!(self, RecorderState::Idle)
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only view of the controller, republished on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderSnapshot {
    /// Current phase.
    pub state: RecorderState,
    /// Seconds recorded in the open session, 0 otherwise.
    pub elapsed_secs: u32,
    /// Tier used by the open session, or the next one.
    pub quality: QualityTier,
    /// Manually selected tier, `None` when bandwidth-driven.
    pub pinned_quality: Option<QualityTier>,
    /// Most recent successful measurement.
    pub bandwidth: Option<BandwidthSample>,
}

/// Notifications broadcast by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// The state machine moved.
    StateChanged(RecorderState),
    /// One second of recording elapsed.
    Tick {
        /// Seconds recorded so far.
        elapsed: u32,
    },
    /// The tier for the upcoming session was decided.
    QualityResolved {
        /// Tier the session opens with.
        tier: QualityTier,
        /// Measurement behind it, if the measurement succeeded.
        bandwidth: Option<BandwidthSample>,
    },
    /// A finished clip reached the store.
    VideoSaved {
        /// Id of the stored record.
        id: String,
        /// Recorded seconds.
        duration: u32,
        /// Tier it was recorded at.
        quality: QualityTier,
    },
    /// Something degraded but the attempt continues.
    Notice {
        /// User-facing text.
        message: String,
    },
    /// The attempt was aborted.
    Failed {
        /// User-facing text.
        message: String,
    },
}
