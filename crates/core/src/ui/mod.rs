//! User interface components for ai-glance.
//!
//! The overlay is an eframe window owned by the main thread. It reads
//! [`OverlayVisual`] snapshots from the pipeline and, on request, runs an
//! interactive region selection on the pipeline's behalf.
//!
//! # Architecture
//!
//! The UI is split into focused submodules:
//! - [`state`]: UI mode and selection request types
//! - [`settings`]: Overlay placement persistence
//! - [`rendering`]: Drawing utilities for overlays and borders
//! - [`selection`]: User interaction handling and coordinate mapping
//! - [`overlay_window`]: Main application logic
//!
//! # Usage
//!
//! ```ignore
//! let (overlay, visual_rx) = OverlayState::new("Ready");
//! let (selector, selection_rx) = ui::selection_channel();
//! let repaint = overlay.repaint_signal();
//! // hand `overlay` and `selector` to the pipeline on another thread, then:
//! ui::run_overlay(visual_rx, repaint, selection_rx, hint)?;
//! ```

mod overlay_window;
mod rendering;
mod selection;
mod settings;
mod state;

pub use overlay_window::OverlayApp;
pub use selection::selection_to_region;
pub use settings::OverlaySettings;
pub use state::SelectionRequest;

use crate::capture::{CaptureRegion, RegionSelector};
use crate::error::{AppError, Result};
use crate::overlay::{OverlayVisual, RepaintSignal};
use async_trait::async_trait;
use eframe::egui;
use std::sync::mpsc;
use tokio::sync::{oneshot, watch};

/// [`RegionSelector`] backed by the overlay window.
pub struct UiRegionSelector {
    tx: mpsc::Sender<SelectionRequest>,
}

#[async_trait]
impl RegionSelector for UiRegionSelector {
    async fn select_region(&self) -> Result<Option<CaptureRegion>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SelectionRequest { reply })
            .map_err(|_| AppError::ui("overlay window is closed"))?;
        response
            .await
            .map_err(|_| AppError::ui("overlay window closed during selection"))
    }
}

/// Creates a selector and the receiver the overlay window polls.
pub fn selection_channel() -> (UiRegionSelector, mpsc::Receiver<SelectionRequest>) {
    let (tx, rx) = mpsc::channel();
    (UiRegionSelector { tx }, rx)
}

/// Runs the overlay window until the pipeline drops its overlay state.
///
/// Must be called on the main thread. `repaint` is connected to the window
/// so every published snapshot triggers a frame immediately.
///
/// # Errors
/// Returns [`AppError::Ui`] if the window cannot be created.
pub fn run_overlay(
    visual_rx: watch::Receiver<OverlayVisual>,
    repaint: RepaintSignal,
    selection_rx: mpsc::Receiver<SelectionRequest>,
    hint: String,
) -> Result<()> {
    let settings = OverlaySettings::load();

    let mut viewport = egui::ViewportBuilder::default()
        .with_title("AI Glance")
        .with_decorations(false)
        .with_transparent(true)
        .with_always_on_top()
        .with_taskbar(false)
        .with_active(false)
        .with_inner_size(settings.size)
        .with_min_inner_size(settings::MIN_SIZE);
    if let Some(position) = settings.position {
        viewport = viewport.with_position(position);
    }

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "AI Glance",
        options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            repaint.connect(move || ctx.request_repaint());
            let app = OverlayApp::new(visual_rx, selection_rx, hint, settings);
            Ok(Box::new(app) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| AppError::ui(format!("Failed to run overlay: {}", e)))
}
