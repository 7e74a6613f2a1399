use crate::{
    CaptureError,
    capture::{
        CaptureBackend, CaptureConstraints, CaptureDevice, ChunkSink, CodecProfile, MediaEncoder,
        MediaStream, MediaTrack, select_device,
    },
    quality::QualityTier,
};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Live binding to a camera/microphone plus an encoder.
///
/// Exclusively owns the device and encoder handles. Dropping the session
/// releases both, so every exit path of a recording frees the camera.
pub struct CaptureSession {
    stream: Option<Box<dyn MediaStream>>,
    encoder: Option<Box<dyn MediaEncoder>>,
    device: Option<CaptureDevice>,
    constraints: CaptureConstraints,
    tier: QualityTier,
}

impl CaptureSession {
    /// Select a device, acquire it for `tier` and attach an encoder.
    ///
    /// Enumeration failures are swallowed and only mean "no preferred
    /// device". VP9 is tried first; the platform default codec is the
    /// silent fallback.
    ///
    /// # Errors
    ///
    /// Any [`CaptureError`] reported while acquiring the device or building
    /// the fallback encoder.
    #[instrument(skip(backend))]
    pub async fn open(
        backend: &dyn CaptureBackend,
        tier: QualityTier,
        configured_device: Option<&str>,
    ) -> Result<Self, CaptureError> {
        let devices = match backend.enumerate_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = ?e, "Device enumeration failed, using backend default");
                Vec::new()
            }
        };

        let device = select_device(&devices, configured_device).cloned();
        let constraints = CaptureConstraints::for_tier(tier, device.as_ref().map(|d| d.id.clone()));

        let mut stream = backend.open_stream(&constraints).await?;

        let encoder = match stream.create_encoder(CodecProfile::Vp9) {
            Ok(encoder) => encoder,
            Err(e) => {
                warn!(error = ?e, "VP9 codec not supported, trying default codec");
                match stream.create_encoder(CodecProfile::PlatformDefault) {
                    Ok(encoder) => encoder,
                    Err(e) => {
                        stream.stop();
                        return Err(e);
                    }
                }
            }
        };

        info!(
            device = ?device.as_ref().map(|d| d.name.as_str()),
            width = constraints.ideal.width,
            height = constraints.ideal.height,
            codec = encoder.profile().mime_type(),
            "Capture session opened"
        );

        Ok(Self {
            stream: Some(stream),
            encoder: Some(encoder),
            device,
            constraints,
            tier,
        })
    }

    /// Start emitting chunks into `sink`, one per `timeslice`.
    #[instrument(skip(self, sink))]
    pub async fn start_recording(
        &mut self,
        timeslice: Duration,
        sink: ChunkSink,
    ) -> Result<(), CaptureError> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| CaptureError::UnknownCaptureError {
                reason: "capture session already torn down".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        encoder.start(timeslice, sink).await
    }

    /// Stop the encoder and wait for its final chunk. No-op when idle.
    #[instrument(skip(self))]
    pub async fn stop_recording(&mut self) -> Result<(), CaptureError> {
        match self.encoder.as_mut() {
            Some(encoder) if encoder.is_active() => encoder.stop().await,
            _ => Ok(()),
        }
    }

    /// Release every device track and drop the encoder. Idempotent.
    pub fn teardown(&mut self) {
        let had_encoder = self.encoder.take().is_some();

        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            info!("Capture session released");
        } else if had_encoder {
            debug!("Encoder dropped without a stream");
        }
    }

    /// Whether the device is still held.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Tracks currently held, empty after teardown.
    pub fn tracks(&self) -> Vec<MediaTrack> {
        self.stream.as_ref().map(|s| s.tracks()).unwrap_or_default()
    }

    /// Device selected at open time, if any was enumerated.
    pub fn device(&self) -> Option<&CaptureDevice> {
        self.device.as_ref()
    }

    /// Constraints the device was opened with.
    pub fn constraints(&self) -> &CaptureConstraints {
        &self.constraints
    }

    /// Tier this session was opened for.
    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    /// Codec profile in use, `None` after teardown.
    pub fn codec(&self) -> Option<CodecProfile> {
        self.encoder.as_ref().map(|e| e.profile())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
