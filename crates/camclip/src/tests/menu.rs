use crate::{MenuAction, MenuIds, app::command_for};

use camclip_core::{AppSnapshot, Command, QualityTier, VideoSummary};
use tray_icon::menu::MenuId;

fn menu_ids() -> MenuIds {
    MenuIds {
        quality_auto: MenuId::new("auto"),
        quality_low: MenuId::new("low"),
        quality_medium: MenuId::new("medium"),
        quality_high: MenuId::new("high"),
        play_latest: MenuId::new("play"),
        close_player: MenuId::new("close"),
        delete_latest: MenuId::new("delete"),
        clear_all: MenuId::new("clear"),
        exit: MenuId::new("exit"),
    }
}

fn summary(id: &str, timestamp: i64) -> VideoSummary {
    VideoSummary {
        id: id.to_string(),
        timestamp,
        duration: 3,
        quality: QualityTier::Medium,
        size_bytes: 42,
    }
}

/// WHAT: Every menu id decodes to its action; foreign ids decode to nothing
/// WHY: Menu events arrive on a global channel shared with other menus
#[test]
fn given_menu_ids_when_decoding_then_matching_actions() {
    // Given: The tray's menu ids
    let ids = menu_ids();

    // When/Then: Each entry maps to its action
    assert_eq!(
        ids.action(&MenuId::new("auto")),
        Some(MenuAction::SelectQuality(None))
    );
    assert_eq!(
        ids.action(&MenuId::new("low")),
        Some(MenuAction::SelectQuality(Some(QualityTier::Low)))
    );
    assert_eq!(
        ids.action(&MenuId::new("high")),
        Some(MenuAction::SelectQuality(Some(QualityTier::High)))
    );
    assert_eq!(ids.action(&MenuId::new("play")), Some(MenuAction::PlayLatest));
    assert_eq!(ids.action(&MenuId::new("delete")), Some(MenuAction::DeleteLatest));
    assert_eq!(ids.action(&MenuId::new("clear")), Some(MenuAction::ClearAll));
    assert_eq!(ids.action(&MenuId::new("exit")), Some(MenuAction::Exit));
    assert_eq!(ids.action(&MenuId::new("unrelated")), None);
}

/// WHAT: Clip actions target the newest clip by timestamp
/// WHY: Store order is insertion order, which need not be newest last
#[test]
fn given_clips_when_mapping_clip_actions_then_newest_targeted() {
    // Given: Two clips, the newer one listed first
    let snapshot = AppSnapshot {
        videos: vec![summary("200", 200), summary("100", 100)],
        ..AppSnapshot::default()
    };

    // When/Then: Play and delete address "200"
    assert_eq!(
        command_for(MenuAction::PlayLatest, &snapshot),
        Some(Command::PlayVideo("200".to_string()))
    );
    assert_eq!(
        command_for(MenuAction::DeleteLatest, &snapshot),
        Some(Command::DeleteVideo("200".to_string()))
    );
}

/// WHAT: Clip actions without clips send nothing; the rest always map
/// WHY: Menu entries may be clicked while their enabled state is stale
#[test]
fn given_no_clips_when_mapping_actions_then_only_global_commands() {
    // Given: An empty snapshot
    let snapshot = AppSnapshot::default();

    // When/Then: Clip actions are dropped, others pass through
    assert_eq!(command_for(MenuAction::PlayLatest, &snapshot), None);
    assert_eq!(command_for(MenuAction::DeleteLatest, &snapshot), None);
    assert_eq!(
        command_for(MenuAction::ClearAll, &snapshot),
        Some(Command::ClearVideos)
    );
    assert_eq!(
        command_for(MenuAction::ClosePlayer, &snapshot),
        Some(Command::CloseVideo)
    );
    assert_eq!(
        command_for(MenuAction::SelectQuality(Some(QualityTier::Medium)), &snapshot),
        Some(Command::SelectQuality(Some(QualityTier::Medium)))
    );
    assert_eq!(
        command_for(MenuAction::Exit, &snapshot),
        Some(Command::Shutdown)
    );
}
