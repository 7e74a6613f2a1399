//! In-crate test doubles for the capture stack and the bandwidth probe.

use crate::{
    BandwidthProbe, BandwidthSample, CaptureBackend, CaptureConstraints, CaptureDevice,
    CaptureError, ChunkSink, CodecProfile, MediaEncoder, MediaStream, MediaTrack, QualityError,
    QualityTier, SavedVideo, TrackKind,
};

use std::{
    panic::Location,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;

pub(crate) const HEADER_CHUNK: &[u8] = b"webm-header";
pub(crate) const TAIL_CHUNK: &[u8] = b"webm-tail";

/// Failure injected when a stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FakeFailure {
    PermissionDenied,
    DeviceNotFound,
    DeviceBusy,
    Unsupported,
}

impl FakeFailure {
    fn to_error(self) -> CaptureError {
        let location = ErrorLocation::from(Location::caller());
        let reason = "injected".to_string();
        match self {
            FakeFailure::PermissionDenied => CaptureError::PermissionDenied { reason, location },
            FakeFailure::DeviceNotFound => CaptureError::DeviceNotFound { reason, location },
            FakeFailure::DeviceBusy => CaptureError::DeviceBusy { reason, location },
            FakeFailure::Unsupported => CaptureError::UnsupportedEnvironment { reason, location },
        }
    }
}

/// Scriptable [`CaptureBackend`] counting device acquisitions and releases.
pub(crate) struct FakeBackend {
    pub devices: Vec<CaptureDevice>,
    pub fail_enumeration: bool,
    pub open_failure: Option<FakeFailure>,
    pub vp9_supported: bool,
    pub default_codec_fails: bool,
    pub emit_chunks: bool,
    pub opens: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
    pub last_constraints: Arc<Mutex<Option<CaptureConstraints>>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            devices: vec![
                CaptureDevice::new("/dev/video2", "OBS Virtual Camera"),
                CaptureDevice::new("/dev/video0", "Integrated Camera"),
            ],
            fail_enumeration: false,
            open_failure: None,
            vp9_supported: true,
            default_codec_fails: false,
            emit_chunks: true,
            opens: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
            last_constraints: Arc::new(Mutex::new(None)),
        }
    }
}

impl FakeBackend {
    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    #[allow(clippy::unwrap_used)]
    pub(crate) fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.last_constraints.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptureBackend for FakeBackend {
    async fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>, CaptureError> {
        if self.fail_enumeration {
            return Err(FakeFailure::Unsupported.to_error());
        }
        Ok(self.devices.clone())
    }

    #[allow(clippy::unwrap_used)]
    async fn open_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        if let Some(failure) = self.open_failure {
            return Err(failure.to_error());
        }

        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_constraints.lock().unwrap() = Some(constraints.clone());

        Ok(Box::new(FakeStream {
            tracks: vec![
                MediaTrack {
                    kind: TrackKind::Video,
                    label: constraints.device_id.clone().unwrap_or_default(),
                    live: true,
                },
                MediaTrack {
                    kind: TrackKind::Audio,
                    label: "mic".to_string(),
                    live: true,
                },
            ],
            vp9_supported: self.vp9_supported,
            default_codec_fails: self.default_codec_fails,
            emit_chunks: self.emit_chunks,
            releases: Arc::clone(&self.releases),
        }))
    }
}

struct FakeStream {
    tracks: Vec<MediaTrack>,
    vp9_supported: bool,
    default_codec_fails: bool,
    emit_chunks: bool,
    releases: Arc<AtomicUsize>,
}

impl MediaStream for FakeStream {
    fn tracks(&self) -> Vec<MediaTrack> {
        self.tracks.clone()
    }

    fn create_encoder(
        &mut self,
        profile: CodecProfile,
    ) -> Result<Box<dyn MediaEncoder>, CaptureError> {
        let unsupported = match profile {
            CodecProfile::Vp9 => !self.vp9_supported,
            CodecProfile::PlatformDefault => self.default_codec_fails,
        };
        if unsupported {
            return Err(CaptureError::UnknownCaptureError {
                reason: format!("{} unsupported", profile.mime_type()),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Box::new(FakeEncoder {
            profile,
            sink: None,
            emit_chunks: self.emit_chunks,
        }))
    }

    fn stop(&mut self) {
        if self.tracks.iter().any(|t| t.live) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
        for track in &mut self.tracks {
            track.live = false;
        }
    }
}

struct FakeEncoder {
    profile: CodecProfile,
    sink: Option<ChunkSink>,
    emit_chunks: bool,
}

#[async_trait]
impl MediaEncoder for FakeEncoder {
    fn profile(&self) -> CodecProfile {
        self.profile
    }

    async fn start(&mut self, _timeslice: Duration, sink: ChunkSink) -> Result<(), CaptureError> {
        if self.emit_chunks {
            let _ = sink.send(HEADER_CHUNK.to_vec());
        }
        self.sink = Some(sink);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(sink) = self.sink.take()
            && self.emit_chunks
        {
            let _ = sink.send(TAIL_CHUNK.to_vec());
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.sink.is_some()
    }
}

/// Outcome scripted for every [`FakeProbe`] measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FakeMeasurement {
    Mbps(f64),
    Timeout,
    Unavailable,
    NetworkError,
}

pub(crate) struct FakeProbe {
    outcome: FakeMeasurement,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub(crate) fn new(outcome: FakeMeasurement) -> Self {
        Self {
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Measurement that takes `delay` before reporting.
    pub(crate) fn slow(outcome: FakeMeasurement, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(outcome)
        }
    }
}

#[async_trait]
impl BandwidthProbe for FakeProbe {
    async fn measure(&self) -> Result<BandwidthSample, QualityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let location = ErrorLocation::from(Location::caller());

        match self.outcome {
            FakeMeasurement::Mbps(mbps) => Ok(BandwidthSample::now(mbps)),
            FakeMeasurement::Timeout => Err(QualityError::MeasurementTimeout { location }),
            FakeMeasurement::Unavailable => Err(QualityError::MeasurementUnavailable {
                reason: "404".to_string(),
                location,
            }),
            FakeMeasurement::NetworkError => Err(QualityError::MeasurementError {
                reason: "connection reset".to_string(),
                location,
            }),
        }
    }
}

pub(crate) fn sample_video(id: &str, duration: u32, quality: QualityTier) -> SavedVideo {
    SavedVideo {
        id: id.to_string(),
        blob_data: format!("media-{}", id).into_bytes(),
        timestamp: id.parse().unwrap_or_default(),
        duration,
        quality,
    }
}
