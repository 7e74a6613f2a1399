//! CamClip: bandwidth-adaptive webcam clips from the system tray.

mod app;
mod app_command;
mod config;
mod error;
mod hotkey_handler;
mod menu_action;
mod playback_server;
#[cfg(test)]
mod tests;
mod tray_command;
mod tray_icon_state;
mod tray_manager;
mod tray_view;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
    hotkey_handler::HotkeyHandler,
    menu_action::{MenuAction, MenuIds},
    tray_command::TrayCommand,
    tray_icon_state::TrayIconState,
    tray_manager::TrayManager,
    tray_view::TrayView,
};

use crate::{app::SnapshotObserver, config::Config};

use std::sync::Arc;

use camclip_core::{
    BlobRegistry, FfmpegBackend, Orchestrator, QualityAdvisor, RecordingController, VideoLibrary,
    VideoStore,
};
use global_hotkey::GlobalHotKeyManager;
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "camclip=debug,camclip_core=debug";
const CHANNEL_CAPACITY: usize = 32;

/// Application entry point.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let event_loop = EventLoopBuilder::<TrayCommand>::with_user_event().build();
    let tray_proxy = event_loop.create_proxy();

    // TrayManager lives on the main thread - TrayIcon is !Send on all platforms.
    let mut tray_manager = match TrayManager::new() {
        Ok(tm) => tm,
        Err(e) => {
            error!("Failed to create TrayManager: {:?}", e);
            std::process::exit(1);
        }
    };

    // Dropping the manager unregisters the hotkey.
    let mut hotkey_manager: Option<GlobalHotKeyManager> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::UserEvent(cmd) => {
                match cmd {
                    TrayCommand::Render(view) => {
                        if let Err(e) = tray_manager.render(&view) {
                            error!(error = ?e, "Failed to update tray icon");
                        }
                    }
                    TrayCommand::Shutdown => {
                        *control_flow = ControlFlow::ExitWithCode(0);
                    }
                }
                return;
            }
            Event::NewEvents(tao::event::StartCause::Init) => {
                let config = match Config::load() {
                    Ok(c) => c,
                    Err(e) => {
                        error!("Failed to load config: {:?}", e);
                        std::process::exit(1);
                    }
                };

                let database_path = match config.database_path() {
                    Ok(path) => path,
                    Err(e) => {
                        error!("Failed to resolve clip database path: {:?}", e);
                        std::process::exit(1);
                    }
                };

                #[cfg(target_os = "macos")]
                unsafe {
                    use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};
                    CFRunLoopWakeUp(CFRunLoopGetMain());
                }

                // Register on the main thread: tao's event loop pumps the
                // Windows messages needed for WM_HOTKEY delivery.
                let (manager, hotkey_id) = match HotkeyHandler::register_hotkey() {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Failed to register hotkey: {:?}", e);
                        std::process::exit(1);
                    }
                };
                hotkey_manager = Some(manager);

                let tray_proxy = tray_proxy.clone();
                let menu_ids = tray_manager.menu_ids().clone();

                // Tokio runtime on a separate thread.
                // TrayManager and hotkey_manager stay on the main thread.
                std::thread::spawn(move || {
                    let rt = match tokio::runtime::Runtime::new() {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to create tokio runtime: {:?}", e);
                            std::process::exit(1);
                        }
                    };

                    rt.block_on(async {
                        let store = VideoStore::open(&database_path);
                        let backend = Arc::new(FfmpegBackend::new());

                        if let Err(e) = app::preflight(&*backend, &store).await {
                            warn!(error = ?e, "Startup check failed");
                        }

                        let controller = RecordingController::new(
                            Arc::new(QualityAdvisor::new(config.advisor_settings())),
                            backend,
                            store.clone(),
                            config.recorder_settings(),
                        );
                        let registry = BlobRegistry::new(config.blob_base_url());
                        let library = VideoLibrary::new(store, registry.clone());
                        let (orchestrator, handle) =
                            Orchestrator::new(controller, library, CHANNEL_CAPACITY);

                        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
                        let (shutdown_tx, shutdown_rx) = watch::channel(false);
                        let signal_tx = command_tx.clone();
                        let hotkey_handler = HotkeyHandler::new(hotkey_id, command_tx);
                        let server_addr = config.server_addr();

                        let app = App {
                            orchestrator: handle,
                            tray_proxy,
                            config,
                            command_rx,
                            shutdown_tx,
                            menu_ids,
                            observer: SnapshotObserver::default(),
                        };

                        let orchestrator_task = tokio::spawn(orchestrator.run());

                        tokio::join!(
                            async {
                                if let Err(e) = hotkey_handler.run(shutdown_rx.clone()).await {
                                    error!(error = ?e, "Hotkey handler error");
                                }
                            },
                            async {
                                if let Err(e) =
                                    playback_server::serve(server_addr, registry, shutdown_rx.clone())
                                        .await
                                {
                                    error!(error = ?e, "Playback server error");
                                }
                            },
                            async {
                                let mut shutdown_rx = shutdown_rx.clone();
                                tokio::select! {
                                    result = tokio::signal::ctrl_c() => {
                                        if result.is_ok() {
                                            info!("Interrupt received");
                                            let _ = signal_tx.send(AppCommand::Shutdown).await;
                                        }
                                    }
                                    _ = shutdown_rx.changed() => {}
                                }
                            },
                            async {
                                if let Err(e) = app.run().await {
                                    error!(error = ?e, "App error");
                                }
                            }
                        );

                        if let Err(e) = orchestrator_task.await {
                            error!(error = ?e, "Orchestrator task panicked");
                        }
                        info!("Runtime finished");
                    });
                });
            }
            _ => {}
        }

        // Keep hotkey_manager alive in the closure for the app's lifetime.
        let _ = &hotkey_manager;
    });
}
