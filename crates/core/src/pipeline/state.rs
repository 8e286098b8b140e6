//! Pipeline state and inbound hotkey events.

use std::fmt;

/// Where the single scan cycle currently is.
///
/// `Idle` → `Capturing` → `AwaitingResponse` → `Displaying` → `Idle`, with
/// `ShuttingDown` reachable from every state and terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Capturing,
    AwaitingResponse,
    Displaying,
    ShuttingDown,
}

impl PipelineState {
    /// Whether `event` is acted on in this state. Depends on nothing else.
    pub fn accepts(self, event: HotkeyEvent) -> bool {
        match (self, event) {
            (Self::ShuttingDown, _) => false,
            (_, HotkeyEvent::QuitRequested) => true,
            (Self::Idle, _) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::AwaitingResponse => "awaiting response",
            Self::Displaying => "displaying",
            Self::ShuttingDown => "shutting down",
        };
        f.write_str(name)
    }
}

/// Named triggers delivered by the hotkey dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HotkeyEvent {
    ScanRequested,
    ToggleOverlay,
    RegionSelectRequested,
    /// Forget the conversation so far.
    ResetContext,
    QuitRequested,
}

impl fmt::Display for HotkeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ScanRequested => "scan",
            Self::ToggleOverlay => "toggle overlay",
            Self::RegionSelectRequested => "region select",
            Self::ResetContext => "reset context",
            Self::QuitRequested => "quit",
        };
        f.write_str(name)
    }
}
