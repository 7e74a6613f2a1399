use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

/// Bandwidth measurement errors with source location tracking.
///
/// None of these are fatal to the recorder: each resolves to a default
/// tier through [`crate::quality::fallback_quality`].
#[derive(Error, Debug)]
pub enum QualityError {
    /// The reference download did not finish within the measurement window.
    #[error("Bandwidth measurement timed out {location}")]
    MeasurementTimeout {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The reference payload is unreachable or answered with a non-success status.
    #[error("Reference payload unavailable: {reason} {location}")]
    MeasurementUnavailable {
        /// Description of why the payload could not be fetched.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Any other transport failure during measurement.
    #[error("Bandwidth measurement failed: {reason} {location}")]
    MeasurementError {
        /// Description of the transport failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl QualityError {
    /// Short user-facing description of the failure.
    pub fn user_message(&self) -> String {
        let cause = match self {
            QualityError::MeasurementTimeout { .. } => "Timeout exceeded.".to_string(),
            QualityError::MeasurementUnavailable { reason, .. } => {
                format!("Test file is not accessible ({}).", reason)
            }
            QualityError::MeasurementError { reason, .. } => {
                format!("Check your internet connection ({}).", reason)
            }
        };
        format!("Failed to measure connection speed. {}", cause)
    }
}

/// Camera/microphone acquisition errors with source location tracking.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The user or OS refused access to the camera or microphone.
    #[error("Capture permission denied: {reason} {location}")]
    PermissionDenied {
        /// Description of the refused access.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No usable camera or microphone exists.
    #[error("Capture device not found: {reason} {location}")]
    DeviceNotFound {
        /// Description of the missing device.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The device is held by another application.
    #[error("Capture device busy: {reason} {location}")]
    DeviceBusy {
        /// Description of the conflicting use.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The capture facility itself is absent on this host.
    #[error("Capture unsupported: {reason} {location}")]
    UnsupportedEnvironment {
        /// Description of what is missing.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Any capture failure that fits no other variant.
    #[error("Capture error: {reason} {location}")]
    UnknownCaptureError {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl CaptureError {
    /// Short user-facing description of the failure.
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::PermissionDenied { .. } => {
                "To record video, you must allow access to the camera and microphone.".to_string()
            }
            CaptureError::DeviceNotFound { .. } => "Camera or microphone not found.".to_string(),
            CaptureError::DeviceBusy { .. } => {
                "The camera or microphone is already in use by another application.".to_string()
            }
            CaptureError::UnsupportedEnvironment { reason, .. } => {
                format!("Webcam capture is not supported here: {}", reason)
            }
            CaptureError::UnknownCaptureError { reason, .. } => {
                format!("There was an error accessing the camera: {}", reason)
            }
        }
    }
}

/// Durable video store errors with source location tracking.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The local database could not be opened at all.
    #[error("Video store unavailable: {reason} {location}")]
    StoreUnavailable {
        /// Description of the open failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Creating or migrating the record table failed.
    #[error("Video store schema upgrade failed: {reason} {location}")]
    SchemaUpgradeFailed {
        /// Description of the schema failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A single put/get/delete/clear transaction failed.
    #[error("Video store transaction failed: {reason} {location}")]
    TransactionFailed {
        /// Cause reported by the database.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The record violates a store invariant and was not written.
    #[error("Invalid video record: {reason} {location}")]
    InvalidRecord {
        /// The violated invariant.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl StoreError {
    /// Short user-facing description of the failure.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::StoreUnavailable { .. } => "Local video storage is not available.".to_string(),
            StoreError::SchemaUpgradeFailed { .. } => {
                "Local video storage could not be prepared.".to_string()
            }
            StoreError::TransactionFailed { reason, .. } => {
                format!("There was an error saving the video: {}", reason)
            }
            StoreError::InvalidRecord { reason, .. } => {
                format!("The video could not be saved: {}", reason)
            }
        }
    }
}

/// Recording state machine errors with source location tracking.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// A start command arrived while a session is already open.
    #[error("A recording session is already open {location}")]
    AlreadyRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Device or encoder acquisition failed.
    #[error("Capture failed: {source} {location}")]
    Capture {
        /// The underlying capture error.
        #[source]
        source: CaptureError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Persisting the finished clip failed. The clip is lost.
    #[error("Saving recording failed: {source} {location}")]
    Store {
        /// The underlying store error.
        #[source]
        source: StoreError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The encoder produced no media for the session.
    #[error("No media captured {location}")]
    EmptyRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl RecorderError {
    /// Short user-facing description of the failure.
    pub fn user_message(&self) -> String {
        match self {
            RecorderError::AlreadyRecording { .. } => "Recording is already in progress.".to_string(),
            RecorderError::Capture { source, .. } => source.user_message(),
            RecorderError::Store { source, .. } => source.user_message(),
            RecorderError::EmptyRecording { .. } => {
                "The recording contained no video data and was discarded.".to_string()
            }
        }
    }
}

// Manual From impls with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<CaptureError> for RecorderError {
    #[track_caller]
    fn from(source: CaptureError) -> Self {
        RecorderError::Capture {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<StoreError> for RecorderError {
    #[track_caller]
    fn from(source: StoreError) -> Self {
        RecorderError::Store {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`RecorderError`].
pub type Result<T> = std::result::Result<T, RecorderError>;
