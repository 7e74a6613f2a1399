use crate::{
    BlobRegistry, Command, MAX_RECORDING_TIME, Orchestrator, QualityTier, RecorderSettings,
    RecorderState, RecordingController, VideoLibrary, VideoStore, selectors,
    tests::support::{FakeBackend, FakeMeasurement, FakeProbe},
};

use std::{sync::Arc, time::Duration};

fn orchestrator(
    measurement: FakeMeasurement,
    store: VideoStore,
) -> (Orchestrator, crate::OrchestratorHandle, BlobRegistry, Arc<FakeBackend>) {
    let backend = Arc::new(FakeBackend::default());
    let controller = RecordingController::new(
        Arc::new(FakeProbe::new(measurement)),
        backend.clone(),
        store.clone(),
        RecorderSettings::default(),
    );
    let registry = BlobRegistry::new("http://127.0.0.1:7878/blob");
    let library = VideoLibrary::new(store, registry.clone());
    let (orchestrator, handle) = Orchestrator::new(controller, library, 8);

    (orchestrator, handle, registry, backend)
}

/// WHAT: Toggle, play and delete flow through to the snapshot
/// WHY: The command surface is fire-and-forget; state is the only feedback
#[tokio::test(start_paused = true)]
async fn given_commands_when_recording_playing_and_deleting_then_snapshot_tracks_each_step() {
    // Given: An orchestrator over an empty store
    let (mut orchestrator, _handle, registry, _backend) =
        orchestrator(FakeMeasurement::Mbps(6.0), VideoStore::in_memory());

    // When: Starting a recording
    orchestrator.handle(Command::StartOrStopRecording).await;

    // Then: Recording at High
    let snapshot = orchestrator.snapshot();
    assert!(selectors::is_recording(&snapshot));
    assert_eq!(snapshot.current_quality, QualityTier::High);
    assert_eq!(snapshot.bandwidth, Some(6.0));

    // When: Stopping
    orchestrator.handle(Command::StartOrStopRecording).await;

    // Then: One clip listed, user told
    let snapshot = orchestrator.snapshot();
    assert!(!selectors::is_recording(&snapshot));
    assert_eq!(snapshot.videos.len(), 1);
    assert_eq!(snapshot.last_message.as_deref(), Some("Video saved (0s)."));
    let id = snapshot.videos[0].id.clone();

    // When: Playing it
    orchestrator.handle(Command::PlayVideo(id.clone())).await;

    // Then: Selected with a live locator
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.selected_video.as_deref(), Some(id.as_str()));
    assert!(snapshot.selected_locator.is_some());
    assert_eq!(registry.live_count(), 1);

    // When: Deleting it
    orchestrator.handle(Command::DeleteVideo(id)).await;

    // Then: Gone, locator revoked
    let snapshot = orchestrator.snapshot();
    assert!(!selectors::has_recorded_videos(&snapshot));
    assert!(snapshot.selected_locator.is_none());
    assert_eq!(registry.live_count(), 0);
}

/// WHAT: The run loop auto-stops at the cap and shuts down cleanly
/// WHY: Ticks and commands share one actor; shutdown releases everything
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_running_loop_when_cap_reached_then_clip_listed_and_shutdown_releases() {
    // Given: A running orchestrator
    let store = VideoStore::in_memory();
    let (orchestrator, handle, registry, backend) =
        orchestrator(FakeMeasurement::Mbps(3.0), store.clone());
    let mut snapshots = handle.snapshot();
    let task = tokio::spawn(orchestrator.run());

    // When: Starting and letting the cap expire
    assert!(handle.send(Command::StartOrStopRecording).await);
    let snapshot = snapshots
        .wait_for(|s| s.videos.len() == 1)
        .await
        .unwrap()
        .clone();

    // Then: One clip of cap length, recorder idle
    assert_eq!(snapshot.videos[0].duration, MAX_RECORDING_TIME);
    assert_eq!(snapshot.recording_time, 0);
    assert!(!selectors::is_recording(&snapshot));

    // When: Playing then shutting down
    assert!(handle.send(Command::PlayVideo(snapshot.videos[0].id.clone())).await);
    assert!(handle.send(Command::Shutdown).await);
    task.await.unwrap();

    // Then: Locators revoked, device released, clip persisted
    assert_eq!(registry.live_count(), 0);
    assert_eq!(backend.releases(), 1);
    assert_eq!(store.count().await.unwrap(), 1);
    assert!(!handle.send(Command::LoadVideos).await);
}

/// WHAT: A failing store yields an empty list and a message
/// WHY: Missing local storage degrades to an empty library, not a crash
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_unavailable_store_when_loading_then_empty_list_and_message() {
    // Given: A store that cannot be opened
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();
    let (mut orchestrator, _handle, _registry, _backend) = orchestrator(
        FakeMeasurement::Mbps(3.0),
        VideoStore::open(blocker.join("videos.sqlite3")),
    );

    // When: Loading
    orchestrator.handle(Command::LoadVideos).await;

    // Then: Empty list, explanatory message
    let snapshot = orchestrator.snapshot();
    assert!(snapshot.videos.is_empty());
    assert!(
        snapshot
            .last_message
            .unwrap()
            .starts_with("Failed to load videos.")
    );
}

/// WHAT: A bandwidth failure notice reaches the snapshot
/// WHY: Users learn why quality dropped to the default
#[tokio::test(start_paused = true)]
async fn given_unreachable_probe_when_starting_then_notice_published() {
    // Given: A probe whose payload is missing
    let (mut orchestrator, _handle, _registry, _backend) =
        orchestrator(FakeMeasurement::Unavailable, VideoStore::in_memory());

    // When: Starting
    orchestrator.handle(Command::StartOrStopRecording).await;

    // Then: Still recording at Medium, with the notice
    let snapshot = orchestrator.snapshot();
    assert!(selectors::is_recording(&snapshot));
    assert_eq!(snapshot.current_quality, QualityTier::Medium);
    assert_eq!(
        snapshot.last_message.as_deref(),
        Some(
            "Failed to measure connection speed. Test file is not accessible (404). Video quality set to medium."
        )
    );
}

/// WHAT: Selecting a quality pins it in the snapshot
/// WHY: The tray shows which tier the next clip will use
#[tokio::test]
async fn given_quality_selection_when_handled_then_snapshot_pinned() {
    // Given: An idle orchestrator
    let (mut orchestrator, _handle, _registry, _backend) =
        orchestrator(FakeMeasurement::Mbps(3.0), VideoStore::in_memory());

    // When: Selecting Low
    orchestrator
        .handle(Command::SelectQuality(Some(QualityTier::Low)))
        .await;

    // Then: Pinned and current are Low
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.pinned_quality, Some(QualityTier::Low));
    assert_eq!(selectors::current_quality(&snapshot), QualityTier::Low);
}

/// WHAT: Initializing is published while a slow measurement is running
/// WHY: Observers show the starting state before the toggle command returns
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_slow_measurement_when_starting_then_initializing_published_before_recording() {
    // Given: A running orchestrator whose measurement takes five seconds
    let store = VideoStore::in_memory();
    let backend = Arc::new(FakeBackend::default());
    let controller = RecordingController::new(
        Arc::new(FakeProbe::slow(FakeMeasurement::Mbps(6.0), Duration::from_secs(5))),
        backend,
        store.clone(),
        RecorderSettings::default(),
    );
    let library = VideoLibrary::new(store, BlobRegistry::new("http://127.0.0.1:7878/blob"));
    let (orchestrator, handle) = Orchestrator::new(controller, library, 8);
    let mut snapshots = handle.snapshot();
    let task = tokio::spawn(orchestrator.run());

    // When: Toggling recording
    assert!(handle.send(Command::StartOrStopRecording).await);

    // Then: Initializing shows up first, then Recording at High
    snapshots
        .wait_for(|s| s.recorder_state == RecorderState::Initializing)
        .await
        .unwrap();
    let recording = snapshots
        .wait_for(|s| s.recorder_state == RecorderState::Recording)
        .await
        .unwrap()
        .clone();
    assert_eq!(recording.current_quality, QualityTier::High);
    assert_eq!(recording.bandwidth, Some(6.0));

    assert!(handle.send(Command::Shutdown).await);
    task.await.unwrap();
}
