use crate::{
    CoreResult,
    library::{AppSnapshot, VideoLibrary},
    orchestrator::Command,
    recorder::{RecorderEvent, RecorderSnapshot, RecordingController},
    store::SavedVideo,
};

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, instrument, warn};

/// Sending side of an [`Orchestrator`].
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<AppSnapshot>,
}

impl OrchestratorHandle {
    /// Queue `command`. Returns `false` once the orchestrator has stopped.
    pub async fn send(&self, command: Command) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Queue `command` without waiting. Returns `false` when full or stopped.
    pub fn try_send(&self, command: Command) -> bool {
        self.commands.try_send(command).is_ok()
    }

    /// Observe derived state.
    pub fn snapshot(&self) -> watch::Receiver<AppSnapshot> {
        self.snapshot.clone()
    }
}

/// Single actor owning the recorder and the video library.
///
/// Commands and recording ticks are handled one at a time from one task,
/// and an [`AppSnapshot`] is published after each. Recorder phase changes
/// made while a command is still running are relayed as they happen.
pub struct Orchestrator {
    controller: RecordingController,
    library: VideoLibrary,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Receiver<RecorderEvent>,
    snapshot: Arc<watch::Sender<AppSnapshot>>,
    last_message: Option<String>,
}

impl Orchestrator {
    /// Build the actor and its handle. `capacity` bounds the command queue.
    pub fn new(
        controller: RecordingController,
        library: VideoLibrary,
        capacity: usize,
    ) -> (Self, OrchestratorHandle) {
        let (command_tx, commands) = mpsc::channel(capacity);
        let (snapshot, snapshot_rx) = watch::channel(AppSnapshot::default());
        let events = controller.subscribe();

        let orchestrator = Self {
            controller,
            library,
            commands,
            events,
            snapshot: Arc::new(snapshot),
            last_message: None,
        };
        let handle = OrchestratorHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
        };

        (orchestrator, handle)
    }

    /// Load the library, then serve commands until `Shutdown` or every
    /// handle is dropped.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("Orchestrator started");

        let relay = tokio::spawn(relay_recorder(
            self.controller.watch(),
            Arc::clone(&self.snapshot),
        ));

        self.handle(Command::LoadVideos).await;
        self.publish();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command).await,
                },
                () = self.controller.next_tick() => {
                    let result = self.controller.tick().await;
                    self.absorb(result);
                }
            }

            self.publish();
        }

        relay.abort();
        self.shutdown();
        info!("Orchestrator stopped");
    }

    /// Apply one command.
    pub async fn handle(&mut self, command: Command) {
        match command {
            Command::StartOrStopRecording => {
                let result = self.controller.toggle().await;
                self.absorb(result);
            }
            Command::SelectQuality(tier) => self.controller.select_quality(tier),
            Command::DeleteVideo(id) => {
                if let Err(e) = self.library.delete(&id).await {
                    error!(video_id = %id, error = ?e, "Failed to delete video");
                    self.last_message = Some(e.user_message());
                }
            }
            Command::PlayVideo(id) => {
                if self.library.play(&id).is_none() {
                    warn!(video_id = %id, "Play requested for unknown video");
                    self.last_message = Some("Video not found.".to_string());
                }
            }
            Command::CloseVideo => self.library.close(),
            Command::ClearVideos => {
                if let Err(e) = self.library.clear().await {
                    error!(error = ?e, "Failed to clear videos");
                    self.last_message = Some(e.user_message());
                }
            }
            Command::LoadVideos => {
                if let Err(e) = self.library.load().await {
                    self.last_message = Some(format!("Failed to load videos. {}", e.user_message()));
                }
            }
            Command::Shutdown => self.shutdown(),
        }
    }

    /// Derived state as of now.
    pub fn snapshot(&self) -> AppSnapshot {
        let recorder = self.controller.snapshot();

        AppSnapshot {
            videos: self.library.summaries(),
            recorder_state: recorder.state,
            current_quality: recorder.quality,
            pinned_quality: recorder.pinned_quality,
            bandwidth: recorder.bandwidth.map(|b| b.mbps),
            recording_time: recorder.elapsed_secs,
            selected_video: self.library.selected().map(str::to_string),
            selected_locator: self.library.selected_locator().map(|l| l.url().to_string()),
            last_message: self.last_message.clone(),
        }
    }

    /// Recorder driven by this actor.
    pub fn controller(&self) -> &RecordingController {
        &self.controller
    }

    /// Library driven by this actor.
    pub fn library(&self) -> &VideoLibrary {
        &self.library
    }

    fn absorb(&mut self, result: CoreResult<Option<SavedVideo>>) {
        self.collect_messages();

        match result {
            Ok(Some(video)) => {
                self.last_message = Some(format!("Video saved ({}).", video.duration_label()));
                self.library.insert(video);
            }
            Ok(None) => {}
            Err(e) => self.last_message = Some(e.user_message()),
        }
    }

    fn collect_messages(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(RecorderEvent::Notice { message }) | Ok(RecorderEvent::Failed { message }) => {
                    self.last_message = Some(message);
                }
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Recorder events lagged");
                }
                Err(_) => break,
            }
        }
    }

    fn shutdown(&mut self) {
        self.controller.teardown();
        self.library.release_all();
        self.publish();
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.snapshot());
    }
}

/// Copy recorder changes into the published snapshot while the actor is
/// busy inside a command, so `Initializing` and `Finalizing` are visible.
async fn relay_recorder(
    mut recorder: watch::Receiver<RecorderSnapshot>,
    snapshot: Arc<watch::Sender<AppSnapshot>>,
) {
    while recorder.changed().await.is_ok() {
        let current = recorder.borrow_and_update().clone();
        snapshot.send_if_modified(|published| apply_recorder(published, current));
    }
}

fn apply_recorder(published: &mut AppSnapshot, recorder: RecorderSnapshot) -> bool {
    let bandwidth = recorder.bandwidth.map(|b| b.mbps);
    let changed = published.recorder_state != recorder.state
        || published.recording_time != recorder.elapsed_secs
        || published.current_quality != recorder.quality
        || published.pinned_quality != recorder.pinned_quality
        || published.bandwidth != bandwidth;

    if changed {
        published.recorder_state = recorder.state;
        published.recording_time = recorder.elapsed_secs;
        published.current_quality = recorder.quality;
        published.pinned_quality = recorder.pinned_quality;
        published.bandwidth = bandwidth;
    }

    changed
}
