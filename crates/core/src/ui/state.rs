//! UI mode and the messages the pipeline sends to the overlay window.

use crate::capture::CaptureRegion;
use eframe::egui;
use tokio::sync::oneshot;

/// Asks the overlay window to run an interactive region selection.
///
/// The window answers on `reply` with `None` when the user cancels.
pub struct SelectionRequest {
    pub reply: oneshot::Sender<Option<CaptureRegion>>,
}

/// Drag state of a running selection.
pub(crate) struct SelectionSession {
    pub start: Option<egui::Pos2>,
    pub current: Option<egui::Pos2>,
    pub reply: Option<oneshot::Sender<Option<CaptureRegion>>>,
}

impl SelectionSession {
    pub fn new(reply: oneshot::Sender<Option<CaptureRegion>>) -> Self {
        Self {
            start: None,
            current: None,
            reply: Some(reply),
        }
    }
}

/// What the overlay window is doing.
///
/// `Overlay` -> `Selecting` (on request) -> `Overlay` (on completion or Escape)
pub(crate) enum UiMode {
    /// Small always-on-top panel mirroring the pipeline's overlay state.
    Overlay,
    /// Fullscreen dimmed surface for dragging out a capture region.
    Selecting(SelectionSession),
}
