//! Integration tests for the scan pipeline using mock collaborators.
//! Fully deterministic: no screen, no network, no window.
//!
//! Run: cargo test --test pipeline_test

use ai_glance_core::ai::request::NO_TEXT_PLACEHOLDER;
use ai_glance_core::ai::{
    AiClient, AiMode, AiRequest, AiTransport, RequestBuilder, RetryPolicy, Role, TransportReply,
};
use ai_glance_core::capture::{CaptureProvider, CaptureRegion, CaptureResult, RegionSelector};
use ai_glance_core::config::ExtractionPolicy;
use ai_glance_core::error::{AiFailure, AppError, Result};
use ai_glance_core::ocr::TextExtractor;
use ai_glance_core::overlay::{ContentKind, OverlayState, OverlayVisual};
use ai_glance_core::pipeline::{
    Collaborators, HotkeyEvent, Orchestrator, OrchestratorHandle, PipelineSettings, PipelineState,
    RESET_NOTICE,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// Mock implementations
// ---------------------------------------------------------------------------

/// Counts concurrent holders and remembers the peak.
#[derive(Default)]
struct Concurrency {
    active: AtomicUsize,
    peak: AtomicUsize,
}

struct ActiveGuard<'a>(&'a Concurrency);

impl Concurrency {
    fn enter(&self) -> ActiveGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveGuard(self)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
enum CaptureBehavior {
    #[default]
    Frame,
    Fail(&'static str),
    Hang,
}

struct MockCapture {
    behavior: CaptureBehavior,
    overlay_rx: watch::Receiver<OverlayVisual>,
    calls: AtomicUsize,
    concurrency: Concurrency,
    /// Overlay visibility observed at the moment of each grab.
    visible_at_grab: Mutex<Vec<bool>>,
    regions: Mutex<Vec<Option<CaptureRegion>>>,
}

#[async_trait]
impl CaptureProvider for MockCapture {
    async fn capture(&self, region: Option<CaptureRegion>) -> Result<CaptureResult> {
        let _guard = self.concurrency.enter();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.visible_at_grab.lock().unwrap().push(self.overlay_rx.borrow().visible);
        self.regions.lock().unwrap().push(region);

        match self.behavior {
            CaptureBehavior::Frame => Ok(CaptureResult {
                image_bytes: vec![0x89, b'P', b'N', b'G'],
                width: 640,
                height: 480,
                timestamp: SystemTime::now(),
            }),
            CaptureBehavior::Fail(message) => Err(AppError::capture(message)),
            CaptureBehavior::Hang => std::future::pending().await,
        }
    }
}

#[derive(Clone)]
enum Reply {
    Answer(&'static str),
    Fail(AiFailure),
    Hang,
}

struct MockTransport {
    script: Mutex<VecDeque<Reply>>,
    /// Used once the script is exhausted.
    fallback: Reply,
    calls: AtomicUsize,
    concurrency: Concurrency,
    requests: Mutex<Vec<AiRequest>>,
}

#[async_trait]
impl AiTransport for MockTransport {
    async fn execute(&self, request: &AiRequest) -> std::result::Result<TransportReply, AiFailure> {
        let _guard = self.concurrency.enter();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Answer(text) => Ok(TransportReply {
                text: text.to_string(),
                tokens_used: Some(12),
            }),
            Reply::Fail(failure) => Err(failure),
            Reply::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockSelector {
    region: Option<CaptureRegion>,
    /// Never answers, like a user who walked away mid-drag.
    hang: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl RegionSelector for MockSelector {
    async fn select_region(&self) -> Result<Option<CaptureRegion>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(self.region)
    }
}

struct MockExtractor {
    text: std::result::Result<&'static str, &'static str>,
}

#[async_trait]
impl TextExtractor for MockExtractor {
    async fn extract_text(&self, _image_bytes: &[u8]) -> Result<String> {
        self.text
            .map(str::to_string)
            .map_err(AppError::extraction)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

const SELECTED: CaptureRegion = CaptureRegion {
    x: 100,
    y: 50,
    width: 800,
    height: 600,
};

struct Setup {
    capture: CaptureBehavior,
    replies: Vec<Reply>,
    fallback: Reply,
    mode: AiMode,
    extractor: Option<MockExtractor>,
    policy: ExtractionPolicy,
    max_retries: u32,
    grace: Duration,
    selector_hangs: bool,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            capture: CaptureBehavior::Frame,
            replies: Vec::new(),
            fallback: Reply::Answer("42"),
            mode: AiMode::Vision,
            extractor: None,
            policy: ExtractionPolicy::Placeholder,
            max_retries: 2,
            grace: Duration::from_millis(300),
            selector_hangs: false,
        }
    }
}

struct Harness {
    orchestrator: Orchestrator,
    handle: OrchestratorHandle,
    capture: Arc<MockCapture>,
    transport: Arc<MockTransport>,
    selector: Arc<MockSelector>,
    visual_rx: watch::Receiver<OverlayVisual>,
}

impl Harness {
    fn new(setup: Setup) -> Self {
        let (overlay, visual_rx) = OverlayState::new("Ready");

        let capture = Arc::new(MockCapture {
            behavior: setup.capture,
            overlay_rx: overlay.subscribe(),
            calls: AtomicUsize::new(0),
            concurrency: Concurrency::default(),
            visible_at_grab: Mutex::new(Vec::new()),
            regions: Mutex::new(Vec::new()),
        });
        let transport = Arc::new(MockTransport {
            script: Mutex::new(setup.replies.into()),
            fallback: setup.fallback,
            calls: AtomicUsize::new(0),
            concurrency: Concurrency::default(),
            requests: Mutex::new(Vec::new()),
        });
        let selector = Arc::new(MockSelector {
            region: Some(SELECTED),
            hang: setup.selector_hangs,
            calls: AtomicUsize::new(0),
        });

        let policy = RetryPolicy {
            max_retries: setup.max_retries,
            base_backoff: Duration::from_millis(5),
        };
        let collaborators = Collaborators {
            capture: capture.clone(),
            extractor: setup
                .extractor
                .map(|e| Arc::new(e) as Arc<dyn TextExtractor>),
            client: Arc::new(AiClient::new(transport.clone(), policy)),
            selector: selector.clone(),
        };
        let settings = PipelineSettings {
            mode: setup.mode,
            request_timeout: Duration::from_secs(5),
            capture_settle: Duration::ZERO,
            shutdown_grace: setup.grace,
            extraction_policy: setup.policy,
            context_limit: 6,
            initial_region: None,
            builder: RequestBuilder::new("test-model"),
        };

        let (orchestrator, handle) = Orchestrator::new(settings, collaborators, overlay);
        Self {
            orchestrator,
            handle,
            capture,
            transport,
            selector,
            visual_rx,
        }
    }

    fn press(&self, event: HotkeyEvent) {
        self.handle.on_hotkey(event);
    }

    /// Handles exactly one message.
    async fn step(&mut self) -> bool {
        tokio::time::timeout(Duration::from_secs(5), self.orchestrator.next_event())
            .await
            .expect("pipeline stalled")
    }

    /// Handles messages until the current cycle is over.
    async fn finish_cycle(&mut self) {
        while !matches!(
            self.orchestrator.state(),
            PipelineState::Idle | PipelineState::ShuttingDown
        ) {
            self.step().await;
        }
    }

    fn state(&self) -> PipelineState {
        self.orchestrator.state()
    }

    fn overlay(&self) -> &OverlayVisual {
        self.orchestrator.overlay()
    }

    fn requests(&self) -> Vec<AiRequest> {
        self.transport.requests.lock().unwrap().clone()
    }

    fn capture_calls(&self) -> usize {
        self.capture.calls.load(Ordering::SeqCst)
    }

    fn transport_calls(&self) -> usize {
        self.transport.calls.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Scan goes through every state and ends with the answer on screen.
#[tokio::test]
async fn scan_shows_answer_and_records_exchange() {
    let mut h = Harness::new(Setup::default());

    h.press(HotkeyEvent::ScanRequested);
    assert!(h.step().await);
    assert_eq!(h.state(), PipelineState::Capturing);
    assert!(!h.overlay().visible);

    assert!(h.step().await);
    assert_eq!(h.state(), PipelineState::AwaitingResponse);
    assert!(h.overlay().visible);
    assert_eq!(h.overlay().kind, ContentKind::Busy);

    assert!(h.step().await);
    assert_eq!(h.state(), PipelineState::Idle);
    assert!(h.overlay().visible);
    assert_eq!(h.overlay().kind, ContentKind::Answer);
    assert_eq!(h.overlay().text, "42");
    assert_eq!(h.visual_rx.borrow().text, "42");

    let context = h.orchestrator.context();
    assert_eq!(context.len(), 1);
    assert_eq!(context.iter().next().unwrap().answer, "42");

    let requests = h.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "test-model");
    assert_eq!(requests[0].messages.len(), 2);
    assert!(requests[0].image.is_some());
}

/// The frame is grabbed only after the overlay is gone.
#[tokio::test]
async fn overlay_is_hidden_when_frame_is_grabbed() {
    let mut h = Harness::new(Setup::default());
    for _ in 0..3 {
        h.press(HotkeyEvent::ScanRequested);
        h.step().await;
        h.finish_cycle().await;
    }
    assert_eq!(*h.capture.visible_at_grab.lock().unwrap(), vec![false, false, false]);
}

/// The second request carries the first exchange before the new turn.
#[tokio::test]
async fn follow_up_scan_carries_history() {
    let mut h = Harness::new(Setup {
        replies: vec![Reply::Answer("42"), Reply::Answer("Still 42")],
        ..Setup::default()
    });

    for _ in 0..2 {
        h.press(HotkeyEvent::ScanRequested);
        h.step().await;
        h.finish_cycle().await;
    }

    let requests = h.requests();
    let second = &requests[1].messages;
    assert_eq!(second.len(), 4);
    assert_eq!(second[0].role, Role::System);
    assert_eq!(second[1].role, Role::User);
    assert_eq!(second[2].role, Role::Assistant);
    assert_eq!(second[2].content, "42");
    assert_eq!(second[3].role, Role::User);
    assert_eq!(h.overlay().text, "Still 42");
    assert_eq!(h.orchestrator.context().len(), 2);
}

/// A failed capture is reported and the pipeline accepts the next scan.
#[tokio::test]
async fn capture_failure_is_shown_and_pipeline_recovers() {
    let mut h = Harness::new(Setup {
        capture: CaptureBehavior::Fail("permission denied"),
        ..Setup::default()
    });

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    assert!(h.step().await);

    assert_eq!(h.state(), PipelineState::Idle);
    assert!(h.overlay().visible);
    assert_eq!(h.overlay().kind, ContentKind::Error);
    assert!(h.overlay().text.contains("permission denied"));
    assert_eq!(h.transport_calls(), 0);
    assert!(h.orchestrator.context().is_empty());

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    assert_eq!(h.state(), PipelineState::Capturing);
}

/// Scans pressed during a cycle never start a second one.
#[tokio::test]
async fn scans_while_busy_are_dropped() {
    let mut h = Harness::new(Setup::default());

    for _ in 0..3 {
        h.press(HotkeyEvent::ScanRequested);
    }
    h.step().await;
    h.finish_cycle().await;
    // The two queued scans were handled (and dropped) before the capture completed
    assert_eq!(h.capture_calls(), 1);
    assert_eq!(h.transport_calls(), 1);
    assert_eq!(h.orchestrator.context().len(), 1);
    assert_eq!(h.state(), PipelineState::Idle);
}

/// Only quit is acted on while a request is outstanding.
#[tokio::test]
async fn busy_pipeline_ignores_everything_but_quit() {
    let mut h = Harness::new(Setup {
        fallback: Reply::Hang,
        ..Setup::default()
    });

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.step().await;
    assert_eq!(h.state(), PipelineState::AwaitingResponse);
    let revision = h.overlay().revision;

    for event in [
        HotkeyEvent::ToggleOverlay,
        HotkeyEvent::RegionSelectRequested,
        HotkeyEvent::ResetContext,
        HotkeyEvent::ScanRequested,
    ] {
        h.press(event);
        assert!(h.step().await);
        assert_eq!(h.state(), PipelineState::AwaitingResponse);
    }
    assert_eq!(h.overlay().revision, revision);
    assert_eq!(h.selector.calls.load(Ordering::SeqCst), 0);

    h.press(HotkeyEvent::QuitRequested);
    assert!(!h.step().await);
}

/// Quit cancels the outstanding request well within the grace period and
/// nothing touches the overlay afterwards.
#[tokio::test]
async fn quit_while_awaiting_cancels_promptly() {
    let mut h = Harness::new(Setup {
        fallback: Reply::Hang,
        grace: Duration::from_secs(2),
        ..Setup::default()
    });

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.step().await;
    assert_eq!(h.state(), PipelineState::AwaitingResponse);
    let revision = h.visual_rx.borrow().revision;

    let started = Instant::now();
    h.press(HotkeyEvent::QuitRequested);
    assert!(!h.step().await);
    assert!(started.elapsed() < Duration::from_secs(1));

    assert_eq!(h.state(), PipelineState::ShuttingDown);
    assert!(h.orchestrator.context().is_empty());

    // Terminal: further presses are not processed
    h.press(HotkeyEvent::ScanRequested);
    h.press(HotkeyEvent::ToggleOverlay);
    assert!(!h.step().await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.visual_rx.borrow().revision, revision);
    assert_eq!(h.capture_calls(), 1);
}

/// Quit is honoured from idle, mid-capture and mid-request.
#[tokio::test]
async fn quit_from_every_state() {
    let cases = [
        (CaptureBehavior::Frame, Reply::Answer("42"), 0, PipelineState::Idle),
        (CaptureBehavior::Hang, Reply::Answer("42"), 1, PipelineState::Capturing),
        (CaptureBehavior::Frame, Reply::Hang, 2, PipelineState::AwaitingResponse),
    ];

    for (capture, fallback, steps, expected) in cases {
        let mut h = Harness::new(Setup {
            capture,
            fallback,
            ..Setup::default()
        });
        if steps > 0 {
            h.press(HotkeyEvent::ScanRequested);
            for _ in 0..steps {
                h.step().await;
            }
        }
        assert_eq!(h.state(), expected);

        let started = Instant::now();
        h.press(HotkeyEvent::QuitRequested);
        assert!(!h.step().await, "quit ignored while {expected}");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(h.state(), PipelineState::ShuttingDown);
    }
}

/// Transient failures are retried up to the bound, then reported.
#[tokio::test]
async fn transient_failures_exhaust_retries() {
    let mut h = Harness::new(Setup {
        fallback: Reply::Fail(AiFailure::Transient("HTTP 503: busy".into())),
        max_retries: 2,
        ..Setup::default()
    });

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.finish_cycle().await;

    assert_eq!(h.transport_calls(), 3);
    assert_eq!(h.overlay().kind, ContentKind::Error);
    assert!(h.overlay().text.contains("Temporary network failure"));
    assert!(h.orchestrator.context().is_empty());
}

/// One transient hiccup is invisible to the user.
#[tokio::test]
async fn transient_failure_then_success() {
    let mut h = Harness::new(Setup {
        replies: vec![Reply::Fail(AiFailure::Transient("connection reset".into()))],
        ..Setup::default()
    });

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.finish_cycle().await;

    assert_eq!(h.transport_calls(), 2);
    assert_eq!(h.overlay().kind, ContentKind::Answer);
    assert_eq!(h.overlay().text, "42");
}

/// Credential problems are reported once, with a pointer to the token.
#[tokio::test]
async fn auth_failure_is_not_retried() {
    let mut h = Harness::new(Setup {
        fallback: Reply::Fail(AiFailure::Auth("HTTP 401: bad credentials".into())),
        ..Setup::default()
    });

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.finish_cycle().await;

    assert_eq!(h.transport_calls(), 1);
    assert_eq!(h.overlay().kind, ContentKind::Error);
    assert!(h.overlay().text.contains("API token"));
}

/// Every failed cycle is reported on its own, even when the error repeats.
#[tokio::test]
async fn repeated_failures_are_each_reported() {
    let mut h = Harness::new(Setup {
        fallback: Reply::Fail(AiFailure::Auth("HTTP 401: bad credentials".into())),
        ..Setup::default()
    });

    let mut revisions = Vec::new();
    for _ in 0..3 {
        h.press(HotkeyEvent::ScanRequested);
        h.step().await;
        h.finish_cycle().await;
        assert_eq!(h.state(), PipelineState::Idle);
        assert!(h.overlay().visible);
        assert_eq!(h.overlay().kind, ContentKind::Error);
        assert!(h.overlay().text.contains("API token"));
        revisions.push(h.visual_rx.borrow().revision);
    }

    assert_eq!(h.transport_calls(), 3);
    assert!(revisions.windows(2).all(|w| w[0] < w[1]), "{revisions:?}");
}

/// Text-only mode sends the placeholder when OCR finds nothing.
#[tokio::test]
async fn text_mode_sends_placeholder_for_blank_screen() {
    let mut h = Harness::new(Setup {
        mode: AiMode::TextOnly,
        extractor: Some(MockExtractor { text: Ok("  \n ") }),
        ..Setup::default()
    });

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.finish_cycle().await;

    let requests = h.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].image.is_none());
    assert!(requests[0].question().contains(NO_TEXT_PLACEHOLDER));
    assert_eq!(h.overlay().text, "42");
}

/// Text-only mode forwards what OCR read.
#[tokio::test]
async fn text_mode_sends_extracted_text() {
    let mut h = Harness::new(Setup {
        mode: AiMode::TextOnly,
        extractor: Some(MockExtractor {
            text: Ok("What is 6 x 7?"),
        }),
        ..Setup::default()
    });

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.finish_cycle().await;

    assert!(h.requests()[0].question().contains("What is 6 x 7?"));
}

/// With the lenient policy an OCR failure still produces a request.
#[tokio::test]
async fn text_mode_ocr_failure_falls_back_to_placeholder() {
    let mut h = Harness::new(Setup {
        mode: AiMode::TextOnly,
        extractor: Some(MockExtractor {
            text: Err("tesseract not found"),
        }),
        policy: ExtractionPolicy::Placeholder,
        ..Setup::default()
    });

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.finish_cycle().await;

    let requests = h.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].image.is_none());
    assert!(requests[0].question().contains(NO_TEXT_PLACEHOLDER));
    assert_eq!(h.overlay().kind, ContentKind::Answer);
    assert_eq!(h.overlay().text, "42");
}

/// With the strict policy an OCR failure ends the cycle before any request.
#[tokio::test]
async fn text_mode_strict_policy_reports_ocr_failure() {
    let mut h = Harness::new(Setup {
        mode: AiMode::TextOnly,
        extractor: Some(MockExtractor {
            text: Err("tesseract not found"),
        }),
        policy: ExtractionPolicy::Fail,
        ..Setup::default()
    });

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.finish_cycle().await;

    assert_eq!(h.transport_calls(), 0);
    assert_eq!(h.overlay().kind, ContentKind::Error);
    assert!(h.overlay().text.contains("tesseract not found"));
}

/// Reset forgets the conversation and says so.
#[tokio::test]
async fn reset_context_clears_history() {
    let mut h = Harness::new(Setup::default());

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.finish_cycle().await;
    assert_eq!(h.orchestrator.context().len(), 1);

    h.press(HotkeyEvent::ResetContext);
    h.step().await;
    assert!(h.orchestrator.context().is_empty());
    assert_eq!(h.overlay().kind, ContentKind::Info);
    assert_eq!(h.overlay().text, RESET_NOTICE);

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.finish_cycle().await;
    assert_eq!(h.requests()[1].messages.len(), 2);
}

/// A hidden overlay gets no busy notice; the answer brings it back.
#[tokio::test]
async fn hidden_overlay_stays_hidden_while_analyzing() {
    let mut h = Harness::new(Setup::default());

    h.press(HotkeyEvent::ToggleOverlay);
    h.step().await;
    assert!(!h.overlay().visible);

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.step().await;
    assert_eq!(h.state(), PipelineState::AwaitingResponse);
    assert!(!h.overlay().visible);

    h.step().await;
    assert!(h.overlay().visible);
    assert_eq!(h.overlay().text, "42");
}

/// Toggle flips visibility without touching the content.
#[tokio::test]
async fn toggle_flips_visibility_when_idle() {
    let mut h = Harness::new(Setup::default());
    h.press(HotkeyEvent::ToggleOverlay);
    h.press(HotkeyEvent::ToggleOverlay);
    h.step().await;
    assert!(!h.overlay().visible);
    h.step().await;
    assert!(h.overlay().visible);
    assert_eq!(h.overlay().text, "Ready");
}

/// The selected region is used by every later scan.
#[tokio::test]
async fn region_selection_applies_to_later_scans() {
    let mut h = Harness::new(Setup::default());

    h.press(HotkeyEvent::RegionSelectRequested);
    h.step().await;
    assert_eq!(h.orchestrator.region(), Some(SELECTED));
    assert_eq!(h.state(), PipelineState::Idle);

    h.press(HotkeyEvent::ScanRequested);
    h.step().await;
    h.finish_cycle().await;
    assert_eq!(*h.capture.regions.lock().unwrap(), vec![Some(SELECTED)]);
}

/// Quit ends a pending region selection without waiting for the user.
#[tokio::test]
async fn quit_during_region_selection_shuts_down() {
    let mut h = Harness::new(Setup {
        selector_hangs: true,
        ..Setup::default()
    });

    h.press(HotkeyEvent::RegionSelectRequested);
    h.press(HotkeyEvent::QuitRequested);

    let started = Instant::now();
    assert!(!h.step().await);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(h.state(), PipelineState::ShuttingDown);
    assert_eq!(h.selector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.orchestrator.region(), None);
    assert_eq!(h.capture_calls(), 0);
}

/// Every interleaving of short hotkey bursts keeps at most one cycle in
/// flight and stops processing after quit.
#[tokio::test(start_paused = true)]
async fn hotkey_bursts_keep_a_single_cycle() {
    const EVENTS: [HotkeyEvent; 5] = [
        HotkeyEvent::ScanRequested,
        HotkeyEvent::ToggleOverlay,
        HotkeyEvent::RegionSelectRequested,
        HotkeyEvent::ResetContext,
        HotkeyEvent::QuitRequested,
    ];

    for n in 0..EVENTS.len().pow(4) {
        let sequence: Vec<HotkeyEvent> = (0..4)
            .map(|i| EVENTS[(n / EVENTS.len().pow(i)) % EVENTS.len()])
            .collect();
        let scans = sequence.iter().filter(|e| **e == HotkeyEvent::ScanRequested).count();
        let quits = sequence.contains(&HotkeyEvent::QuitRequested);

        let mut h = Harness::new(Setup::default());
        for event in &sequence {
            h.press(*event);
        }

        let mut stopped = false;
        loop {
            let next = tokio::time::timeout(Duration::from_millis(50), h.orchestrator.next_event());
            match next.await {
                Ok(true) => {}
                Ok(false) => {
                    stopped = true;
                    break;
                }
                Err(_) => break,
            }
        }

        assert!(h.capture.concurrency.peak() <= 1, "{sequence:?}");
        assert!(h.transport.concurrency.peak() <= 1, "{sequence:?}");
        assert!(h.capture_calls() <= scans.min(1), "{sequence:?}");
        assert!(h.transport_calls() <= h.capture_calls(), "{sequence:?}");
        assert_eq!(stopped, quits, "{sequence:?}");
        if quits {
            assert_eq!(h.state(), PipelineState::ShuttingDown, "{sequence:?}");
            assert!(h.orchestrator.context().is_empty(), "{sequence:?}");
        } else {
            assert_eq!(h.state(), PipelineState::Idle, "{sequence:?}");
        }
    }
}
