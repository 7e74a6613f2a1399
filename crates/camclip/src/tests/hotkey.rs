use crate::{AppCommand, AppError, HotkeyHandler};

use global_hotkey::{GlobalHotKeyEvent, HotKeyState};
use tokio::sync::mpsc;

/// WHAT: Only presses of the registered hotkey toggle
/// WHY: Key releases and foreign hotkeys must not start or stop a clip
#[test]
fn given_hotkey_events_when_filtering_then_only_own_press_toggles() {
    // Given: A handler for hotkey 7
    let (command_tx, _command_rx) = mpsc::channel(1);
    let handler = HotkeyHandler::new(7, command_tx);

    // When/Then: Press of 7 toggles, release and other ids do not
    assert!(handler.is_toggle(&GlobalHotKeyEvent {
        id: 7,
        state: HotKeyState::Pressed,
    }));
    assert!(!handler.is_toggle(&GlobalHotKeyEvent {
        id: 7,
        state: HotKeyState::Released,
    }));
    assert!(!handler.is_toggle(&GlobalHotKeyEvent {
        id: 8,
        state: HotKeyState::Pressed,
    }));
}

/// WHAT: A press sends exactly one toggle command
/// WHY: The recorder owns the start/stop decision, not the hotkey
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_open_channel_when_hotkey_pressed_then_toggle_sent() {
    // Given: An open command channel
    let (command_tx, mut command_rx) = mpsc::channel(32);
    let handler = HotkeyHandler::new(1, command_tx);

    // When: Handling a press
    handler.handle_hotkey_press().await.unwrap();

    // Then: One toggle arrives
    assert_eq!(command_rx.recv().await, Some(AppCommand::ToggleRecording));
    assert!(command_rx.try_recv().is_err());
}

/// WHAT: A closed channel surfaces as ChannelSendFailed
/// WHY: The handler loop must stop instead of silently dropping presses
#[tokio::test]
async fn given_closed_channel_when_hotkey_pressed_then_channel_send_failed() {
    // Given: A channel whose receiver is gone
    let (command_tx, command_rx) = mpsc::channel(1);
    drop(command_rx);
    let handler = HotkeyHandler::new(1, command_tx);

    // When: Handling a press
    let result = handler.handle_hotkey_press().await;

    // Then: The failure is reported
    assert!(matches!(result, Err(AppError::ChannelSendFailed { .. })));
}
