use crate::quality::{QualityTier, Resolution};

/// Which way the requested camera faces. Clips only use the front camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Towards the user (front camera).
    User,
}

/// Device request derived from a quality tier. Consumed once per session open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Best-effort target frame size.
    pub ideal: Resolution,
    /// Preferred camera orientation. Always [`FacingMode::User`] for clips.
    pub facing: FacingMode,
    /// Exact device to open, when one was selected.
    pub device_id: Option<String>,
    /// Capture the microphone alongside the camera.
    pub audio: bool,
    /// Encoder target in bits per second.
    pub bitrate_bps: u32,
}

impl CaptureConstraints {
    /// Constraints for `tier`, optionally pinned to one device.
    pub fn for_tier(tier: QualityTier, device_id: Option<String>) -> Self {
        Self {
            ideal: tier.resolution(),
            facing: FacingMode::User,
            device_id,
            audio: true,
            bitrate_bps: tier.bitrate_bps(),
        }
    }
}
