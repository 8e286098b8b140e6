//! The scan pipeline: one event loop, one state machine, at most one cycle.
//!
//! Hotkeys and the completions of the two asynchronous legs (capture, AI
//! request) arrive as messages on one channel and are handled in arrival
//! order. Only this loop touches [`PipelineState`], the overlay and the
//! conversation; spawned legs report back by message and never share state.

use super::state::{HotkeyEvent, PipelineState};
use crate::ai::request::NO_TEXT_PLACEHOLDER;
use crate::ai::{AiClient, AiMode, AiResponse, RequestBuilder};
use crate::capture::{CaptureProvider, CaptureRegion, CaptureResult, RegionSelector};
use crate::config::{Config, ExtractionPolicy};
use crate::context::{ConversationContext, Exchange};
use crate::error::{AppError, Result};
use crate::ocr::TextExtractor;
use crate::overlay::{ContentKind, OverlayState, OverlayVisual};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const BUSY_NOTICE: &str = "Analyzing screen…";
pub const RESET_NOTICE: &str = "Conversation cleared.";

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub mode: AiMode,
    /// Bound on each AI attempt.
    pub request_timeout: Duration,
    /// Wait between hiding the overlay and grabbing the frame.
    pub capture_settle: Duration,
    /// How long quit waits for the in-flight leg before aborting it.
    pub shutdown_grace: Duration,
    pub extraction_policy: ExtractionPolicy,
    pub context_limit: usize,
    pub initial_region: Option<CaptureRegion>,
    pub builder: RequestBuilder,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.mode,
            request_timeout: config.request_timeout,
            capture_settle: config.capture_settle,
            shutdown_grace: config.shutdown_grace,
            extraction_policy: config.ocr_fallback,
            context_limit: config.context_limit,
            initial_region: config.capture_region,
            builder: RequestBuilder::new(config.model_name.clone()),
        }
    }
}

/// External collaborators driven by the pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn CaptureProvider>,
    /// Required for [`AiMode::TextOnly`].
    pub extractor: Option<Arc<dyn TextExtractor>>,
    pub client: Arc<AiClient>,
    pub selector: Arc<dyn RegionSelector>,
}

enum PipelineMessage {
    Hotkey(HotkeyEvent),
    Captured { cycle: u64, result: Result<CaptureResult> },
    Resolved { cycle: u64, outcome: CycleOutcome },
}

enum CycleOutcome {
    Answered { question: String, response: AiResponse },
    Failed(AppError),
}

/// Cloneable entry point for the hotkey dispatcher. Safe to call from any
/// thread; never blocks and never fails.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::UnboundedSender<PipelineMessage>,
}

impl OrchestratorHandle {
    pub fn on_hotkey(&self, event: HotkeyEvent) {
        if self.tx.send(PipelineMessage::Hotkey(event)).is_err() {
            log::debug!("pipeline stopped; {} ignored", event);
        }
    }
}

/// Everything a request leg needs, moved into its task.
struct RequestJob {
    capture: CaptureResult,
    context: ConversationContext,
    builder: RequestBuilder,
    mode: AiMode,
    policy: ExtractionPolicy,
    timeout: Duration,
    extractor: Option<Arc<dyn TextExtractor>>,
    client: Arc<AiClient>,
}

pub struct Orchestrator {
    state: PipelineState,
    overlay: OverlayState,
    context: ConversationContext,
    region: Option<CaptureRegion>,
    settings: PipelineSettings,
    collaborators: Collaborators,
    /// Id of the current (or last) cycle; stale completions are discarded.
    cycle: u64,
    /// Overlay visibility before the current cycle hid it.
    restore_visible: bool,
    in_flight: Option<JoinHandle<()>>,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<PipelineMessage>,
    rx: mpsc::UnboundedReceiver<PipelineMessage>,
}

impl Orchestrator {
    pub fn new(
        settings: PipelineSettings,
        collaborators: Collaborators,
        overlay: OverlayState,
    ) -> (Self, OrchestratorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = OrchestratorHandle { tx: tx.clone() };
        let orchestrator = Self {
            state: PipelineState::Idle,
            overlay,
            context: ConversationContext::new(settings.context_limit),
            region: settings.initial_region,
            settings,
            collaborators,
            cycle: 0,
            restore_visible: false,
            in_flight: None,
            cancel: CancellationToken::new(),
            tx,
            rx,
        };
        (orchestrator, handle)
    }

    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle { tx: self.tx.clone() }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn overlay(&self) -> &OverlayVisual {
        self.overlay.visual()
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn region(&self) -> Option<CaptureRegion> {
        self.region
    }

    /// Processes messages until quit.
    pub async fn run(&mut self) {
        log::info!("pipeline ready (mode: {})", self.settings.mode);
        while self.next_event().await {}
        log::info!("pipeline stopped");
    }

    /// Waits for and handles one message. Returns false once shutting down.
    pub async fn next_event(&mut self) -> bool {
        if self.state == PipelineState::ShuttingDown {
            return false;
        }
        let Some(message) = self.rx.recv().await else {
            self.shutdown().await;
            return false;
        };

        match message {
            PipelineMessage::Hotkey(event) => self.on_hotkey(event).await,
            PipelineMessage::Captured { cycle, result } => self.on_captured(cycle, result),
            PipelineMessage::Resolved { cycle, outcome } => self.on_resolved(cycle, outcome),
        }
        self.state != PipelineState::ShuttingDown
    }

    async fn on_hotkey(&mut self, event: HotkeyEvent) {
        if !self.state.accepts(event) {
            log::debug!("{} ignored while {}", event, self.state);
            return;
        }
        match event {
            HotkeyEvent::QuitRequested => self.shutdown().await,
            HotkeyEvent::ScanRequested => self.start_cycle(),
            HotkeyEvent::ToggleOverlay => self.overlay.toggle(),
            HotkeyEvent::RegionSelectRequested => self.select_region().await,
            HotkeyEvent::ResetContext => {
                self.context.clear();
                self.overlay.show(ContentKind::Info, RESET_NOTICE);
                log::info!("conversation cleared");
            }
        }
    }

    fn transition(&mut self, next: PipelineState) {
        log::debug!("pipeline: {} -> {}", self.state, next);
        self.state = next;
    }

    fn start_cycle(&mut self) {
        self.cycle += 1;
        let cycle = self.cycle;

        // The overlay must be gone before the frame is grabbed
        self.restore_visible = self.overlay.is_visible();
        self.overlay.hide();
        self.transition(PipelineState::Capturing);

        let capture = Arc::clone(&self.collaborators.capture);
        let region = self.region;
        let settle = self.settings.capture_settle;
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();

        log::info!(
            "scan #{} started ({})",
            cycle,
            region.map_or_else(|| "full screen".to_string(), |r| format!("region {}", r))
        );

        self.in_flight = Some(tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = async {
                    tokio::time::sleep(settle).await;
                    capture.capture(region).await
                } => {
                    let _ = tx.send(PipelineMessage::Captured { cycle, result });
                }
            }
        }));
    }

    fn on_captured(&mut self, cycle: u64, result: Result<CaptureResult>) {
        if cycle != self.cycle || self.state != PipelineState::Capturing {
            log::debug!("discarding stale capture for scan #{}", cycle);
            return;
        }
        self.in_flight = None;

        let capture = match result {
            Ok(capture) => capture,
            Err(e) => {
                log::warn!("scan #{} capture failed: {}", cycle, e);
                self.overlay.show_error(e.user_message());
                self.transition(PipelineState::Idle);
                return;
            }
        };

        if self.restore_visible {
            self.overlay.show(ContentKind::Busy, BUSY_NOTICE);
        }
        self.transition(PipelineState::AwaitingResponse);

        let job = RequestJob {
            capture,
            context: self.context.clone(),
            builder: self.settings.builder.clone(),
            mode: self.settings.mode,
            policy: self.settings.extraction_policy,
            timeout: self.settings.request_timeout,
            extractor: self.collaborators.extractor.clone(),
            client: Arc::clone(&self.collaborators.client),
        };
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();

        self.in_flight = Some(tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                outcome = run_request(job, cancel.clone()) => {
                    let _ = tx.send(PipelineMessage::Resolved { cycle, outcome });
                }
            }
        }));
    }

    fn on_resolved(&mut self, cycle: u64, outcome: CycleOutcome) {
        if cycle != self.cycle || self.state != PipelineState::AwaitingResponse {
            log::debug!("discarding stale response for scan #{}", cycle);
            return;
        }
        self.in_flight = None;

        match outcome {
            CycleOutcome::Answered { question, response } => {
                self.transition(PipelineState::Displaying);
                log::info!(
                    "scan #{} answered in {:?} ({} attempt(s), tokens: {})",
                    cycle,
                    response.latency,
                    response.attempts,
                    response
                        .tokens_used
                        .map_or_else(|| "n/a".to_string(), |t| t.to_string())
                );
                self.context.push(Exchange::new(question, response.answer_text.clone()));
                self.overlay.show(ContentKind::Answer, response.answer_text);
            }
            CycleOutcome::Failed(e) => {
                log::warn!("scan #{} failed: {}", cycle, e);
                self.overlay.show_error(e.user_message());
            }
        }
        self.transition(PipelineState::Idle);
    }

    /// Runs the selector to completion before any other event is handled.
    /// Quit still interrupts it; other hotkeys pressed meanwhile are dropped.
    async fn select_region(&mut self) {
        let selector = Arc::clone(&self.collaborators.selector);
        let selection = selector.select_region();
        tokio::pin!(selection);

        loop {
            tokio::select! {
                biased;
                result = &mut selection => {
                    match result {
                        Ok(Some(region)) => {
                            log::info!("capture region set to {}", region);
                            self.region = Some(region);
                        }
                        Ok(None) => log::info!("region selection cancelled"),
                        Err(e) => {
                            log::warn!("region selection failed: {}", e);
                            self.overlay.show_error(e.user_message());
                        }
                    }
                    return;
                }
                Some(message) = self.rx.recv() => {
                    if let PipelineMessage::Hotkey(event) = message {
                        if event == HotkeyEvent::QuitRequested {
                            self.shutdown().await;
                            return;
                        }
                        log::debug!("{} ignored during region selection", event);
                    }
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        if self.state == PipelineState::ShuttingDown {
            return;
        }
        log::info!("shutting down (was {})", self.state);
        self.transition(PipelineState::ShuttingDown);
        self.cancel.cancel();

        if let Some(mut task) = self.in_flight.take() {
            if tokio::time::timeout(self.settings.shutdown_grace, &mut task).await.is_err() {
                log::warn!(
                    "in-flight work did not stop within {:?}; aborting",
                    self.settings.shutdown_grace
                );
                task.abort();
            }
        }

        self.context.clear();
        self.rx.close();
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

async fn run_request(job: RequestJob, cancel: CancellationToken) -> CycleOutcome {
    let RequestJob {
        capture,
        context,
        builder,
        mode,
        policy,
        timeout,
        extractor,
        client,
    } = job;

    let extracted = match mode {
        AiMode::Vision => None,
        AiMode::TextOnly => {
            match extract_screen_text(extractor.as_deref(), &capture, policy).await {
                Ok(text) => Some(text),
                Err(e) => return CycleOutcome::Failed(e),
            }
        }
    };

    let request = match builder.build(&context, &capture, mode, extracted.as_deref()) {
        Ok(request) => request,
        Err(e) => return CycleOutcome::Failed(e),
    };
    // The frame is not needed past this point
    drop(capture);

    match client.send(&request, timeout, &cancel).await {
        Ok(response) => CycleOutcome::Answered {
            question: request.question().to_string(),
            response,
        },
        Err(failure) => CycleOutcome::Failed(failure.into()),
    }
}

async fn extract_screen_text(
    extractor: Option<&dyn TextExtractor>,
    capture: &CaptureResult,
    policy: ExtractionPolicy,
) -> Result<String> {
    let result = match extractor {
        Some(extractor) => extractor.extract_text(&capture.image_bytes).await,
        None => Err(AppError::extraction("no text extractor configured")),
    };

    match result {
        Ok(text) if !text.trim().is_empty() => Ok(text),
        Ok(_) => Ok(NO_TEXT_PLACEHOLDER.to_string()),
        Err(e) if policy == ExtractionPolicy::Placeholder => {
            log::warn!("text extraction failed ({}); sending placeholder", e);
            Ok(NO_TEXT_PLACEHOLDER.to_string())
        }
        Err(e) => Err(e),
    }
}
