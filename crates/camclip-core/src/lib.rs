//! CamClip Core Library
//!
//! Bandwidth-adaptive webcam clip recorder: measures throughput, picks a
//! quality tier, records short WebM clips through a capture backend, keeps
//! them in a local SQLite store and hands out revocable playback locators.
//!
//! # Example
//!
//! ```no_run
//! use camclip_core::{
//!     AdvisorSettings, BlobRegistry, Command, CoreResult, FfmpegBackend, Orchestrator,
//!     QualityAdvisor, RecorderSettings, RecordingController, VideoLibrary, VideoStore,
//! };
//!
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let store = VideoStore::open("videos.sqlite3");
//!     let advisor = QualityAdvisor::new(AdvisorSettings::new("https://example.com/sample.bin"));
//!     let controller = RecordingController::new(
//!         Arc::new(advisor),
//!         Arc::new(FfmpegBackend::new()),
//!         store.clone(),
//!         RecorderSettings::default(),
//!     );
//!     let library = VideoLibrary::new(store, BlobRegistry::new("http://127.0.0.1:7878/blob"));
//!
//!     let (orchestrator, handle) = Orchestrator::new(controller, library, 32);
//!     let task = tokio::spawn(orchestrator.run());
//!
//!     handle.send(Command::StartOrStopRecording).await;
//!     tokio::time::sleep(std::time::Duration::from_secs(3)).await;
//!     handle.send(Command::StartOrStopRecording).await;
//!     handle.send(Command::Shutdown).await;
//!
//!     let _ = task.await;
//!     println!("{:?}", handle.snapshot().borrow().videos);
//!     Ok(())
//! }
//! ```

mod capture;
mod error;
mod library;
mod orchestrator;
mod playback;
mod quality;
mod recorder;
mod store;

pub use {
    capture::{
        ARTIFACT_MIME_TYPE, CaptureBackend, CaptureConstraints, CaptureDevice, CaptureSession,
        ChunkSink, CodecProfile, FacingMode, FfmpegBackend, MediaEncoder, MediaStream, MediaTrack,
        TrackKind, select_device,
    },
    error::{CaptureError, QualityError, RecorderError, Result as CoreResult, StoreError},
    library::{AppSnapshot, VideoLibrary, VideoSummary, format_duration, selectors},
    orchestrator::{Command, Orchestrator, OrchestratorHandle},
    playback::{Blob, BlobRegistry, Locator, PlaybackCache},
    quality::{
        AdvisorSettings, BandwidthProbe, BandwidthSample, DEFAULT_QUALITY, HIGH_THRESHOLD,
        LOW_THRESHOLD, MEASUREMENT_TIMEOUT, QualityAdvisor, QualityTier, Resolution, SAMPLE_SIZE,
        TIMEOUT_FALLBACK_MBPS, UnknownQualityTier, fallback_quality, recommended_quality,
    },
    recorder::{
        CHUNK_TIMESLICE, MAX_RECORDING_TIME, RecorderEvent, RecorderSettings, RecorderSnapshot,
        RecorderState, RecordingController, TICK_PERIOD,
    },
    store::{SavedVideo, VideoStore},
};

#[cfg(test)]
mod tests;
