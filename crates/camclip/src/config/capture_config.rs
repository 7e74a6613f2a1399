use crate::config::default_max_recording_secs;

use serde::{Deserialize, Serialize};

/// Camera and clip length configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Device id to prefer when present (None = first physical camera).
    #[serde(default)]
    pub preferred_device: Option<String>,

    /// Recordings stop on their own after this many seconds.
    #[serde(default = "default_max_recording_secs")]
    pub max_recording_secs: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preferred_device: None,
            max_recording_secs: default_max_recording_secs(),
        }
    }
}
