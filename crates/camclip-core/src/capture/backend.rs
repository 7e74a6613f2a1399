//! Seams between the capture session and a concrete camera stack.

use crate::{
    CaptureError,
    capture::{CaptureConstraints, CaptureDevice},
};

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Media type of every assembled artifact.
pub const ARTIFACT_MIME_TYPE: &str = "video/webm";

/// Receives encoded chunks as the encoder flushes them.
pub type ChunkSink = mpsc::UnboundedSender<Vec<u8>>;

/// Encoder profile requested from a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecProfile {
    /// WebM with VP9 video. Preferred.
    Vp9,
    /// Whatever the platform picks for WebM. Always available.
    PlatformDefault,
}

impl CodecProfile {
    /// MIME type produced by this profile.
    pub fn mime_type(self) -> &'static str {
        match self {
            CodecProfile::Vp9 => "video/webm;codecs=vp9",
            CodecProfile::PlatformDefault => ARTIFACT_MIME_TYPE,
        }
    }
}

/// Kind of a live track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Camera.
    Video,
    /// Microphone.
    Audio,
}

/// One device track held by an open stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    /// Camera or microphone.
    pub kind: TrackKind,
    /// Device label.
    pub label: String,
    /// False once the track was released.
    pub live: bool,
}

/// A platform camera/microphone stack.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// List available cameras.
    async fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>, CaptureError>;

    /// Acquire camera + microphone matching `constraints`.
    async fn open_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError>;
}

/// Acquired device tracks.
pub trait MediaStream: Send {
    /// Tracks held by this stream.
    fn tracks(&self) -> Vec<MediaTrack>;

    /// Build an encoder over this stream.
    fn create_encoder(
        &mut self,
        profile: CodecProfile,
    ) -> Result<Box<dyn MediaEncoder>, CaptureError>;

    /// Release every track. Must be safe to call repeatedly.
    fn stop(&mut self);
}

/// Turns a stream into encoded chunks.
#[async_trait]
pub trait MediaEncoder: Send {
    /// Profile this encoder was built with.
    fn profile(&self) -> CodecProfile;

    /// Begin encoding, flushing one chunk to `sink` roughly every `timeslice`.
    ///
    /// Returns once the encoder is known to be running.
    async fn start(&mut self, timeslice: Duration, sink: ChunkSink) -> Result<(), CaptureError>;

    /// Stop encoding. Returns after the final chunk was handed to the sink.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Whether encoding is running.
    fn is_active(&self) -> bool;
}
