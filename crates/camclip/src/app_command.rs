/// Commands sent from the hotkey handler to the main application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Start a recording, or stop the one in progress.
    ToggleRecording,
    /// Request application shutdown.
    Shutdown,
}
