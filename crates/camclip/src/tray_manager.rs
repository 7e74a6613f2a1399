//! System tray icon with state-based updates.
//!
//! Manages a system tray icon with three states (Idle, Recording, Saving)
//! and a context menu for quality selection, clip actions and Exit.

use crate::{AppError, AppResult, MenuIds, TrayIconState, TrayView};

use std::panic::Location;

use camclip_core::QualityTier;
use error_location::ErrorLocation;
use tracing::{debug, info, instrument};
use tray_icon::menu::{CheckMenuItem, IsMenuItem, Menu, MenuItem, PredefinedMenuItem, Submenu};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

/// System tray icon manager.
pub struct TrayManager {
    tray_icon: TrayIcon,
    state: TrayIconState,
    quality_items: [(Option<QualityTier>, CheckMenuItem); 4],
    clip_items: [MenuItem; 3],
    close_item: MenuItem,
    ids: MenuIds,
}

impl TrayManager {
    /// Create a new tray manager with initial state.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let quality_auto = CheckMenuItem::new("Auto", true, true, None);
        let quality_low = CheckMenuItem::new(QualityTier::Low.label(), true, false, None);
        let quality_medium = CheckMenuItem::new(QualityTier::Medium.label(), true, false, None);
        let quality_high = CheckMenuItem::new(QualityTier::High.label(), true, false, None);

        let quality_menu = Submenu::new("Quality", true);
        append(
            &quality_menu,
            &[&quality_auto, &quality_low, &quality_medium, &quality_high],
        )?;

        let play_item = MenuItem::new("Play latest clip", false, None);
        let close_item = MenuItem::new("Close player", false, None);
        let delete_item = MenuItem::new("Delete latest clip", false, None);
        let clear_item = MenuItem::new("Clear all clips", false, None);
        let exit_item = MenuItem::new("Exit", true, None);

        let menu = Menu::new();
        menu.append_items(&[
            &quality_menu,
            &PredefinedMenuItem::separator(),
            &play_item,
            &close_item,
            &delete_item,
            &clear_item,
            &PredefinedMenuItem::separator(),
            &exit_item,
        ])
        .map_err(|e| AppError::TrayError {
            reason: format!("Failed to build tray menu: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let ids = MenuIds {
            quality_auto: quality_auto.id().clone(),
            quality_low: quality_low.id().clone(),
            quality_medium: quality_medium.id().clone(),
            quality_high: quality_high.id().clone(),
            play_latest: play_item.id().clone(),
            close_player: close_item.id().clone(),
            delete_latest: delete_item.id().clone(),
            clear_all: clear_item.id().clone(),
            exit: exit_item.id().clone(),
        };

        let icon = Self::load_icon(TrayIconState::Idle)?;

        let tray_icon = TrayIconBuilder::new()
            .with_tooltip("CamClip - Ready")
            .with_menu(Box::new(menu))
            .with_icon(icon)
            .build()
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to create tray icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("System tray icon initialized");

        Ok(Self {
            tray_icon,
            state: TrayIconState::Idle,
            quality_items: [
                (None, quality_auto),
                (Some(QualityTier::Low), quality_low),
                (Some(QualityTier::Medium), quality_medium),
                (Some(QualityTier::High), quality_high),
            ],
            clip_items: [play_item, delete_item, clear_item],
            close_item,
            ids,
        })
    }

    /// Redraw icon, tooltip, quality checkmarks and enabled entries.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn render(&mut self, view: &TrayView) -> AppResult<()> {
        if view.state != self.state {
            self.tray_icon
                .set_icon(Some(Self::load_icon(view.state)?))
                .map_err(|e| AppError::TrayError {
                    reason: format!("Failed to update icon: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
            self.state = view.state;
            debug!(state = ?view.state, "Tray icon changed");
        }

        self.tray_icon
            .set_tooltip(Some(view.tooltip.as_str()))
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to update tooltip: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        // Check items toggle themselves on click; re-assert the pinned one.
        for (tier, item) in &self.quality_items {
            item.set_checked(*tier == view.pinned);
        }
        for item in &self.clip_items {
            item.set_enabled(view.has_clips);
        }
        self.close_item.set_enabled(view.playing);

        Ok(())
    }

    /// Ids of the menu entries, for decoding menu events.
    pub fn menu_ids(&self) -> &MenuIds {
        &self.ids
    }

    /// Load icon from compile-time embedded PNG bytes.
    ///
    /// Icons are embedded via include_bytes! so they work regardless of
    /// install location.
    #[track_caller]
    fn load_icon(state: TrayIconState) -> AppResult<Icon> {
        let png_bytes: &[u8] = match state {
            TrayIconState::Idle => include_bytes!("../resources/icons/idle.png"),
            TrayIconState::Recording => include_bytes!("../resources/icons/recording.png"),
            TrayIconState::Saving => include_bytes!("../resources/icons/saving.png"),
        };

        let img = image::load_from_memory(png_bytes).map_err(|e| AppError::TrayError {
            reason: format!("Failed to decode embedded icon: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let rgba = img.into_rgba8();
        let (width, height) = (rgba.width(), rgba.height());

        Icon::from_rgba(rgba.into_raw(), width, height).map_err(|e| AppError::TrayError {
            reason: format!("Failed to create icon from RGBA: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

#[track_caller]
fn append(submenu: &Submenu, items: &[&dyn IsMenuItem]) -> AppResult<()> {
    submenu.append_items(items).map_err(|e| AppError::TrayError {
        reason: format!("Failed to build quality menu: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })
}
