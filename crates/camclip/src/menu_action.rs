use camclip_core::QualityTier;

use tray_icon::menu::MenuId;

/// What a tray menu click asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Pin a tier, or return to bandwidth-driven quality with `None`.
    SelectQuality(Option<QualityTier>),
    /// Open the newest clip in the default player.
    PlayLatest,
    /// Release the open clip.
    ClosePlayer,
    /// Delete the newest clip.
    DeleteLatest,
    /// Delete every clip.
    ClearAll,
    /// Quit.
    Exit,
}

/// Ids of the tray menu entries.
///
/// Cloned off the main thread so the async side can decode menu events
/// without touching the `!Send` tray.
#[derive(Debug, Clone)]
pub struct MenuIds {
    pub(crate) quality_auto: MenuId,
    pub(crate) quality_low: MenuId,
    pub(crate) quality_medium: MenuId,
    pub(crate) quality_high: MenuId,
    pub(crate) play_latest: MenuId,
    pub(crate) close_player: MenuId,
    pub(crate) delete_latest: MenuId,
    pub(crate) clear_all: MenuId,
    pub(crate) exit: MenuId,
}

impl MenuIds {
    /// Decode a clicked menu id.
    pub fn action(&self, id: &MenuId) -> Option<MenuAction> {
        let action = if *id == self.quality_auto {
            MenuAction::SelectQuality(None)
        } else if *id == self.quality_low {
            MenuAction::SelectQuality(Some(QualityTier::Low))
        } else if *id == self.quality_medium {
            MenuAction::SelectQuality(Some(QualityTier::Medium))
        } else if *id == self.quality_high {
            MenuAction::SelectQuality(Some(QualityTier::High))
        } else if *id == self.play_latest {
            MenuAction::PlayLatest
        } else if *id == self.close_player {
            MenuAction::ClosePlayer
        } else if *id == self.delete_latest {
            MenuAction::DeleteLatest
        } else if *id == self.clear_all {
            MenuAction::ClearAll
        } else if *id == self.exit {
            MenuAction::Exit
        } else {
            return None;
        };

        Some(action)
    }
}
