//! AI-Glance Core Library
//!
//! This library provides the core functionality for the AI-Glance screen
//! assistant: a hotkey triggers a screen capture, the capture is sent to an
//! AI model together with the recent conversation, and the answer appears in
//! an always-on-top overlay.
//!
//! # Overview
//!
//! - **Pipeline**: Single-cycle state machine driven by hotkeys via [`pipeline`]
//! - **Screen Capture**: Multi-monitor and region capture via the [`capture`] module
//! - **AI Integration**: Request building, retry and providers via [`ai`]
//! - **Text Extraction**: Tesseract OCR for text-only mode via [`ocr`]
//! - **User Interface**: The overlay window and region selection via [`ui`]
//!
//! # Quick Start
//!
//! The simplest way to use the library is through the [`AiGlance`] facade:
//!
//! ```ignore
//! use ai_glance_core::{AiGlance, OverlayState, ui};
//! use std::sync::Arc;
//!
//! let app = AiGlance::new()?;
//! let (overlay, visual_rx) = OverlayState::new("Ready");
//! let repaint = overlay.repaint_signal();
//! let (selector, selection_rx) = ui::selection_channel();
//! let (mut orchestrator, handle) = app.into_pipeline(overlay, Arc::new(selector))?;
//!
//! // run `orchestrator.run()` on a tokio runtime, feed `handle` with hotkeys,
//! // and keep the main thread for the window:
//! ui::run_overlay(visual_rx, repaint, selection_rx, "Ctrl+Shift+S to scan".into())?;
//! ```
//!
//! # Module Structure
//!
//! - [`ai`]: Request builder, AI client and provider transports
//! - [`capture`]: Screen capture functionality
//! - [`config`]: Configuration loading and management
//! - [`context`]: Bounded conversation history
//! - [`error`]: Error types and result aliases
//! - [`image_processing`]: Image encoding utilities
//! - [`ocr`]: Text extraction
//! - [`overlay`]: Overlay state shared with the window
//! - [`pipeline`]: Hotkey events, pipeline state and the orchestrator
//! - [`ui`]: User interface components

pub mod ai;
pub mod capture;
pub mod config;
pub mod context;
pub mod error;
pub mod image_processing;
pub mod ocr;
pub mod overlay;
pub mod pipeline;
pub mod ui;

// Re-export primary types for convenience
pub use ai::{AiClient, AiMode, AiRequest, AiResponse, AiTransport, RequestBuilder};
pub use capture::{CaptureProvider, CaptureRegion, CaptureResult, RegionSelector, ScreenCapturer};
pub use config::Config;
pub use context::{ConversationContext, Exchange};
pub use error::{AiFailure, AppError, Result};
pub use ocr::{TesseractExtractor, TextExtractor};
pub use overlay::{ContentKind, OverlayState, OverlayVisual, RepaintSignal};
pub use pipeline::{
    Collaborators, HotkeyEvent, Orchestrator, OrchestratorHandle, PipelineSettings, PipelineState,
};

use std::sync::Arc;

/// Main entry point for the AI-Glance application.
///
/// This struct provides a facade over the various subsystems, wiring the
/// production collaborators into a pipeline.
pub struct AiGlance {
    config: Config,
    capturer: ScreenCapturer,
}

impl AiGlance {
    /// Creates a new instance with configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required configuration is missing or invalid
    /// - Screen capture initialization fails (e.g., no display available)
    pub fn new() -> Result<Self> {
        Self::with_config(Config::load()?)
    }

    /// Creates an instance with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured monitor does not exist.
    pub fn with_config(config: Config) -> Result<Self> {
        let capturer = ScreenCapturer::new(config.monitor)?;
        Ok(Self { config, capturer })
    }

    /// Lists available monitors with their dimensions.
    pub fn list_monitors(&self) -> Vec<String> {
        self.capturer.list_screen()
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Builds the orchestrator around the screen capturer, the configured
    /// AI provider and, in text-only mode, the Tesseract extractor.
    ///
    /// # Errors
    ///
    /// Returns an error if the AI transport cannot be created.
    pub fn into_pipeline(
        self,
        overlay: OverlayState,
        selector: Arc<dyn RegionSelector>,
    ) -> Result<(Orchestrator, OrchestratorHandle)> {
        let client = ai::client_for(&self.config)?;
        let extractor: Option<Arc<dyn TextExtractor>> = match self.config.mode {
            AiMode::TextOnly => Some(Arc::new(TesseractExtractor::new(
                self.config.ocr_languages.clone(),
            ))),
            AiMode::Vision => None,
        };

        let collaborators = Collaborators {
            capture: Arc::new(self.capturer),
            extractor,
            client: Arc::new(client),
            selector,
        };
        let settings = PipelineSettings::from_config(&self.config);
        Ok(Orchestrator::new(settings, collaborators, overlay))
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
/// This loads `.env` files if present.
pub fn init() {
    let _ = dotenvy::dotenv();
}
