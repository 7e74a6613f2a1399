use crate::{AppCommand, AppResult, MenuAction, MenuIds, TrayCommand, TrayView, config::Config};

use std::time::Duration;

use camclip_core::{
    AppSnapshot, CaptureBackend, Command, OrchestratorHandle, QualityTier, VideoStore, selectors,
};
use tao::event_loop::EventLoopProxy;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument, warn};
use tray_icon::menu::MenuEvent;

/// Main application state.
///
/// Runs on the async runtime thread. Tray updates go back to the main
/// thread through `tray_proxy` because `TrayIcon` is `!Send` and must
/// remain on the UI thread.
pub struct App {
    pub(crate) orchestrator: OrchestratorHandle,
    pub(crate) tray_proxy: EventLoopProxy<TrayCommand>,
    pub(crate) config: Config,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) menu_ids: MenuIds,
    pub(crate) observer: SnapshotObserver,
}

impl App {
    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("CamClip starting");

        if self.config.quality.pinned.is_some() {
            self.forward(Command::SelectQuality(self.config.quality.pinned))
                .await;
        }

        // MenuEvent::receiver() is a crossbeam receiver with a blocking
        // recv(); one blocking task forwards into tokio. Dropping
        // tray_event_rx makes the next blocking_send() fail and ends it.
        let (tray_event_tx, mut tray_event_rx) = mpsc::channel(32);
        let tray_handle = tokio::task::spawn_blocking(move || {
            let receiver = MenuEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if tray_event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        let mut snapshots = self.orchestrator.snapshot();
        let initial = snapshots.borrow_and_update().clone();
        self.observe(&initial);

        loop {
            tokio::select! {
                Some(event) = tray_event_rx.recv() => {
                    let snapshot = snapshots.borrow().clone();
                    if !self.handle_menu_event(event, &snapshot).await {
                        break;
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AppCommand::ToggleRecording => {
                            self.forward(Command::StartOrStopRecording).await;
                        }
                        AppCommand::Shutdown => {
                            info!("Shutdown requested");
                            break;
                        }
                    }
                }

                changed = snapshots.changed() => {
                    if changed.is_err() {
                        info!("Orchestrator stopped");
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.observe(&snapshot);
                }

                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        drop(tray_event_rx);

        match tokio::time::timeout(Duration::from_secs(1), tray_handle).await {
            Ok(Ok(())) => info!("Tray event forwarder stopped cleanly"),
            Ok(Err(e)) => error!(error = ?e, "Tray event forwarder task panicked"),
            Err(_) => info!(
                "Tray event forwarder did not stop within timeout, \
                     will be cleaned up on exit"
            ),
        }

        self.forward(Command::Shutdown).await;
        let _ = self.shutdown_tx.send(true);
        let _ = self.tray_proxy.send_event(TrayCommand::Shutdown);
        info!("CamClip shut down successfully");

        Ok(())
    }

    /// Handle one tray menu click. Returns false when the app should exit.
    #[instrument(skip(self, snapshot))]
    async fn handle_menu_event(&mut self, event: MenuEvent, snapshot: &AppSnapshot) -> bool {
        let Some(action) = self.menu_ids.action(&event.id) else {
            return true;
        };

        match action {
            MenuAction::Exit => {
                info!("Exit requested from tray menu");
                return false;
            }
            MenuAction::SelectQuality(tier) => self.pin_quality(tier),
            MenuAction::PlayLatest => self.observer.expect_locator(),
            MenuAction::ClosePlayer => self.observer.cancel_locator(),
            _ => {}
        }

        if let Some(command) = command_for(action, snapshot) {
            self.forward(command).await;
        }

        true
    }

    fn pin_quality(&mut self, tier: Option<QualityTier>) {
        self.config.quality.pinned = tier;
        if let Err(e) = self.config.save() {
            warn!(error = ?e, "Failed to persist quality selection");
        }
    }

    async fn forward(&self, command: Command) {
        if !self.orchestrator.send(command.clone()).await {
            warn!(?command, "Orchestrator is gone, command dropped");
        }
    }

    fn observe(&mut self, snapshot: &AppSnapshot) {
        let observation = self.observer.observe(snapshot);

        if let Some(view) = observation.render {
            if self.tray_proxy.send_event(TrayCommand::Render(view)).is_err() {
                warn!("Tray event loop is gone");
            }
        }

        if let Some(url) = observation.open {
            info!(%url, "Opening clip");
            if let Err(e) = open::that(&url) {
                error!(error = ?e, %url, "Failed to open clip in player");
            }
        }
    }
}

/// Orchestrator command for a menu action, if any.
///
/// Clip actions address the newest clip and do nothing without clips.
pub(crate) fn command_for(action: MenuAction, snapshot: &AppSnapshot) -> Option<Command> {
    match action {
        MenuAction::SelectQuality(tier) => Some(Command::SelectQuality(tier)),
        MenuAction::PlayLatest => {
            selectors::latest_video(snapshot).map(|video| Command::PlayVideo(video.id.clone()))
        }
        MenuAction::ClosePlayer => Some(Command::CloseVideo),
        MenuAction::DeleteLatest => {
            selectors::latest_video(snapshot).map(|video| Command::DeleteVideo(video.id.clone()))
        }
        MenuAction::ClearAll => Some(Command::ClearVideos),
        MenuAction::Exit => Some(Command::Shutdown),
    }
}

/// What changed for the outside world after one snapshot.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Observation {
    pub(crate) render: Option<TrayView>,
    pub(crate) open: Option<String>,
}

/// Turns published snapshots into tray redraws and player launches.
#[derive(Debug, Default)]
pub(crate) struct SnapshotObserver {
    view: Option<TrayView>,
    message: Option<String>,
    awaiting_locator: bool,
}

impl SnapshotObserver {
    /// Open the next locator that shows up in a snapshot.
    pub(crate) fn expect_locator(&mut self) {
        self.awaiting_locator = true;
    }

    pub(crate) fn cancel_locator(&mut self) {
        self.awaiting_locator = false;
    }

    pub(crate) fn observe(&mut self, snapshot: &AppSnapshot) -> Observation {
        if snapshot.last_message != self.message {
            if let Some(message) = &snapshot.last_message {
                info!(%message, "Notice");
            }
            self.message = snapshot.last_message.clone();
        }

        let view = TrayView::from_snapshot(snapshot);
        let render = (self.view.as_ref() != Some(&view)).then(|| {
            self.view = Some(view.clone());
            view
        });

        let open = match &snapshot.selected_locator {
            Some(url) if self.awaiting_locator => {
                self.awaiting_locator = false;
                Some(url.clone())
            }
            _ => None,
        };

        Observation { render, open }
    }
}

/// Log what the camera stack and the clip store look like at startup.
#[instrument(skip_all)]
pub(crate) async fn preflight(backend: &dyn CaptureBackend, store: &VideoStore) -> AppResult<()> {
    let devices = backend.enumerate_devices().await?;
    if devices.is_empty() {
        warn!("No camera found; recordings will fail until one is connected");
    }
    for device in &devices {
        info!(id = %device.id, name = %device.name, "Camera available");
    }

    let clips = store.count().await?;
    info!(clips, "Clip store ready");

    Ok(())
}
