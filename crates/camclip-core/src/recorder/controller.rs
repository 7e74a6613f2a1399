use crate::{
    CaptureError, CoreResult, RecorderError,
    capture::{CaptureBackend, CaptureSession},
    quality::{
        BandwidthProbe, BandwidthSample, DEFAULT_QUALITY, QualityTier, fallback_quality,
        recommended_quality,
    },
    recorder::{RecorderEvent, RecorderSnapshot, RecorderState, timer::RecordingTimer},
    store::{SavedVideo, VideoStore},
};

use std::{panic::Location, sync::Arc, time::Duration};

use chrono::Utc;
use error_location::ErrorLocation;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Recording length cap in seconds.
pub const MAX_RECORDING_TIME: u32 = 10;
/// Period between encoder chunk flushes.
pub const CHUNK_TIMESLICE: Duration = Duration::from_secs(1);
/// Period of the elapsed-time tick.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 64;

/// Tunables for [`RecordingController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderSettings {
    /// Auto-stop once this many seconds were recorded.
    pub max_duration_secs: u32,
    /// Encoder flush period.
    pub timeslice: Duration,
    /// Elapsed-time tick period.
    pub tick_period: Duration,
    /// Device id to prefer when it is enumerated.
    pub preferred_device: Option<String>,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            max_duration_secs: MAX_RECORDING_TIME,
            timeslice: CHUNK_TIMESLICE,
            tick_period: TICK_PERIOD,
            preferred_device: None,
        }
    }
}

struct RecordingSession {
    capture: CaptureSession,
    timer: RecordingTimer,
    chunk_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    chunks: Vec<Vec<u8>>,
    elapsed: u32,
    tier: QualityTier,
}

impl RecordingSession {
    fn drain_chunks(&mut self) {
        while let Ok(chunk) = self.chunk_rx.try_recv() {
            if !chunk.is_empty() {
                self.chunks.push(chunk);
            }
        }
    }
}

/// The capture/record state machine.
///
/// Owns at most one recording session at a time. All transitions happen
/// inside `&mut self` calls, so a start cannot interleave with a finalize.
/// Progress is driven from outside: await [`Self::next_tick`] and feed the
/// result to [`Self::tick`].
pub struct RecordingController {
    probe: Arc<dyn BandwidthProbe>,
    backend: Arc<dyn CaptureBackend>,
    store: VideoStore,
    settings: RecorderSettings,
    state: RecorderState,
    session: Option<RecordingSession>,
    quality: QualityTier,
    pinned_quality: Option<QualityTier>,
    bandwidth: Option<BandwidthSample>,
    last_id: i64,
    events: broadcast::Sender<RecorderEvent>,
    snapshot: watch::Sender<RecorderSnapshot>,
}

impl RecordingController {
    /// Idle controller.
    pub fn new(
        probe: Arc<dyn BandwidthProbe>,
        backend: Arc<dyn CaptureBackend>,
        store: VideoStore,
        settings: RecorderSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshot, _) = watch::channel(RecorderSnapshot {
            state: RecorderState::Idle,
            elapsed_secs: 0,
            quality: DEFAULT_QUALITY,
            pinned_quality: None,
            bandwidth: None,
        });

        Self {
            probe,
            backend,
            store,
            settings,
            state: RecorderState::Idle,
            session: None,
            quality: DEFAULT_QUALITY,
            pinned_quality: None,
            bandwidth: None,
            last_id: 0,
            events,
            snapshot,
        }
    }

    /// Receive every [`RecorderEvent`] emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.events.subscribe()
    }

    /// Observe the latest [`RecorderSnapshot`].
    pub fn watch(&self) -> watch::Receiver<RecorderSnapshot> {
        self.snapshot.subscribe()
    }

    /// Current read-only view.
    pub fn snapshot(&self) -> RecorderSnapshot {
        RecorderSnapshot {
            state: self.state.clone(),
            elapsed_secs: self.elapsed_secs(),
            quality: self.quality,
            pinned_quality: self.pinned_quality,
            bandwidth: self.bandwidth,
        }
    }

    /// Current phase.
    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    /// Tier of the open session, or the one the next session starts from.
    pub fn quality(&self) -> QualityTier {
        self.quality
    }

    /// Manually selected tier.
    pub fn pinned_quality(&self) -> Option<QualityTier> {
        self.pinned_quality
    }

    /// Most recent successful measurement.
    pub fn bandwidth(&self) -> Option<BandwidthSample> {
        self.bandwidth
    }

    /// Seconds recorded in the open session.
    pub fn elapsed_secs(&self) -> u32 {
        self.session.as_ref().map(|s| s.elapsed).unwrap_or(0)
    }

    /// Chunks collected so far in the open session.
    pub fn buffered_chunks(&self) -> usize {
        self.session.as_ref().map(|s| s.chunks.len()).unwrap_or(0)
    }

    /// Whether a session is recording.
    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    /// Measure, resolve quality, open the device and start recording.
    ///
    /// A failed measurement only degrades the tier. A failed capture moves
    /// through `Errored` back to `Idle`.
    ///
    /// # Errors
    ///
    /// [`RecorderError::AlreadyRecording`] when not idle; the session in
    /// progress is left untouched. [`RecorderError::Capture`] when the
    /// device or encoder cannot be acquired.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> CoreResult<()> {
        if !self.state.is_idle() || self.session.is_some() {
            warn!(state = %self.state, "Start ignored, a session is already open");
            return Err(RecorderError::AlreadyRecording {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.transition(RecorderState::Initializing);

        let (measured, sample) = match self.probe.measure().await {
            Ok(sample) => {
                self.bandwidth = Some(sample);
                (recommended_quality(sample.mbps), Some(sample))
            }
            Err(e) => {
                let fallback = fallback_quality(&e);
                warn!(error = ?e, fallback = %fallback, "Bandwidth measurement failed");
                self.emit(RecorderEvent::Notice {
                    message: format!(
                        "{} Video quality set to {}.",
                        e.user_message(),
                        fallback.as_str()
                    ),
                });
                (fallback, None)
            }
        };

        let tier = self.pinned_quality.unwrap_or(measured);
        self.quality = tier;
        self.emit(RecorderEvent::QualityResolved {
            tier,
            bandwidth: sample,
        });

        let mut capture = match CaptureSession::open(
            self.backend.as_ref(),
            tier,
            self.settings.preferred_device.as_deref(),
        )
        .await
        {
            Ok(capture) => capture,
            Err(e) => return Err(self.abort_start(e)),
        };

        self.transition(RecorderState::Ready);

        let (sink, chunk_rx) = mpsc::unbounded_channel();
        if let Err(e) = capture.start_recording(self.settings.timeslice, sink).await {
            capture.teardown();
            return Err(self.abort_start(e));
        }

        self.session = Some(RecordingSession {
            capture,
            timer: RecordingTimer::start(self.settings.tick_period),
            chunk_rx,
            chunks: Vec::new(),
            elapsed: 0,
            tier,
        });
        self.transition(RecorderState::Recording);

        info!(quality = %tier, "Recording started");

        Ok(())
    }

    /// Resolves on the next timer tick of the open session. Never resolves
    /// without one. Cancel-safe, so it can sit in a `select!`.
    pub async fn next_tick(&mut self) {
        match self.session.as_mut() {
            Some(session) => session.timer.tick().await,
            None => std::future::pending().await,
        }
    }

    /// Count one elapsed second. Reaching the cap runs [`Self::stop`].
    ///
    /// Returns the stored clip when the cap finalized the session.
    pub async fn tick(&mut self) -> CoreResult<Option<SavedVideo>> {
        if !self.state.is_recording() {
            return Ok(None);
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };

        session.drain_chunks();
        session.elapsed += 1;
        let elapsed = session.elapsed;

        self.emit(RecorderEvent::Tick { elapsed });
        self.publish();

        if elapsed >= self.settings.max_duration_secs {
            info!(elapsed, "Recording time limit reached");
            return self.stop().await;
        }

        Ok(None)
    }

    /// Stop recording, assemble the clip and persist it.
    ///
    /// A stop without an active recording is a no-op returning `Ok(None)`.
    /// Device and timer are released on every path. A persist failure is
    /// reported and the clip is dropped.
    ///
    /// # Errors
    ///
    /// [`RecorderError::EmptyRecording`] when nothing was captured,
    /// [`RecorderError::Store`] when the clip could not be saved.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> CoreResult<Option<SavedVideo>> {
        if !self.state.is_recording() {
            debug!(state = %self.state, "Stop ignored, not recording");
            return Ok(None);
        }
        let Some(session) = self.session.take() else {
            self.transition(RecorderState::Idle);
            return Ok(None);
        };

        self.transition(RecorderState::Finalizing);

        let RecordingSession {
            mut capture,
            timer,
            mut chunk_rx,
            mut chunks,
            elapsed,
            tier,
        } = session;
        drop(timer);

        let encoder_result = capture.stop_recording().await;
        while let Ok(chunk) = chunk_rx.try_recv() {
            if !chunk.is_empty() {
                chunks.push(chunk);
            }
        }

        let outcome = self.persist(encoder_result, chunks, elapsed, tier).await;
        capture.teardown();

        match outcome {
            Ok(video) => {
                info!(
                    video_id = %video.id,
                    duration = video.duration,
                    quality = %tier,
                    "Recording saved"
                );
                self.emit(RecorderEvent::VideoSaved {
                    id: video.id.clone(),
                    duration: video.duration,
                    quality: video.quality,
                });
                self.transition(RecorderState::Idle);
                Ok(Some(video))
            }
            Err(e) => Err(self.abort(e)),
        }
    }

    /// Start when idle, stop when recording, ignore otherwise.
    pub async fn toggle(&mut self) -> CoreResult<Option<SavedVideo>> {
        match self.state {
            RecorderState::Idle => self.start().await.map(|()| None),
            RecorderState::Recording => self.stop().await,
            _ => Ok(None),
        }
    }

    /// Pin a tier, or return to bandwidth-driven selection with `None`.
    ///
    /// An open session keeps its tier; the choice applies from the next one.
    pub fn select_quality(&mut self, tier: Option<QualityTier>) {
        self.pinned_quality = tier;

        if self.session.is_none() {
            self.quality = match tier {
                Some(tier) => tier,
                None => self
                    .bandwidth
                    .map(|b| recommended_quality(b.mbps))
                    .unwrap_or(self.quality),
            };
        }

        info!(pinned = ?tier, quality = %self.quality, "Quality selection changed");
        self.publish();
    }

    /// Release timer, encoder and device without saving anything.
    pub fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.capture.teardown();
            info!(elapsed = session.elapsed, "Recording discarded on teardown");
        }

        if !self.state.is_idle() {
            self.transition(RecorderState::Idle);
        }
    }

    async fn persist(
        &mut self,
        encoder_result: Result<(), CaptureError>,
        chunks: Vec<Vec<u8>>,
        duration: u32,
        quality: QualityTier,
    ) -> CoreResult<SavedVideo> {
        let blob_data = chunks.concat();

        match encoder_result {
            Err(e) if blob_data.is_empty() => return Err(e.into()),
            Err(e) => warn!(error = ?e, "Encoder stopped with an error, keeping captured media"),
            Ok(()) => {}
        }

        if blob_data.is_empty() {
            return Err(RecorderError::EmptyRecording {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let (id, timestamp) = self.next_id();
        let video = SavedVideo {
            id,
            blob_data,
            timestamp,
            duration,
            quality,
        };

        self.store.put(&video).await?;

        Ok(video)
    }

    // Millisecond timestamps, bumped so two clips never share an id.
    fn next_id(&mut self) -> (String, i64) {
        let now = Utc::now().timestamp_millis();
        let id = now.max(self.last_id + 1);
        self.last_id = id;
        (id.to_string(), now)
    }

    // A start that never reached the device falls back to the default tier.
    fn abort_start(&mut self, error: CaptureError) -> RecorderError {
        self.quality = self.pinned_quality.unwrap_or(DEFAULT_QUALITY);
        self.abort(error.into())
    }

    fn abort(&mut self, error: RecorderError) -> RecorderError {
        let message = error.user_message();
        warn!(error = ?error, "Recording attempt failed");

        self.transition(RecorderState::Errored {
            message: message.clone(),
        });
        self.emit(RecorderEvent::Failed { message });
        self.transition(RecorderState::Idle);

        error
    }

    fn transition(&mut self, state: RecorderState) {
        debug!(from = %self.state, to = %state, "Recorder state change");
        self.state = state.clone();
        self.emit(RecorderEvent::StateChanged(state));
        self.publish();
    }

    fn emit(&self, event: RecorderEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.snapshot());
    }
}
