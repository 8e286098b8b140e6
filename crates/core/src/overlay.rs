//! Overlay visibility and content.
//!
//! [`OverlayState`] is the single writer: only the pipeline orchestrator owns
//! it. Every mutation publishes a snapshot on a `watch` channel that the UI
//! thread reads; the UI never writes back. A connected [`RepaintSignal`]
//! wakes the window on every publish so a hide reaches the screen within a
//! frame instead of at the window's next poll.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;
use tokio::sync::watch;

type Waker = Box<dyn Fn() + Send + Sync>;

/// Wakes the UI thread when a new snapshot is published.
///
/// Clones share one slot; the window connects it once it has a context.
#[derive(Clone, Default)]
pub struct RepaintSignal(Arc<OnceLock<Waker>>);

impl RepaintSignal {
    /// Installs the wake-up callback. Only the first call takes effect.
    pub fn connect(&self, wake: impl Fn() + Send + Sync + 'static) {
        if self.0.set(Box::new(wake)).is_err() {
            log::debug!("repaint signal already connected");
        }
    }

    fn notify(&self) {
        if let Some(wake) = self.0.get() {
            wake();
        }
    }
}

impl fmt::Debug for RepaintSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepaintSignal")
            .field("connected", &self.0.get().is_some())
            .finish()
    }
}

/// What the overlay is currently showing, used for styling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Info,
    /// A request is in flight.
    Busy,
    Answer,
    Error,
}

#[derive(Clone, Debug)]
pub struct OverlayVisual {
    pub visible: bool,
    pub text: String,
    pub kind: ContentKind,
    pub last_updated: SystemTime,
    /// Bumped on every published change.
    pub revision: u64,
}

pub struct OverlayState {
    visual: OverlayVisual,
    tx: watch::Sender<OverlayVisual>,
    repaint: RepaintSignal,
}

impl OverlayState {
    /// Starts visible with an informational greeting.
    pub fn new(greeting: impl Into<String>) -> (Self, watch::Receiver<OverlayVisual>) {
        let visual = OverlayVisual {
            visible: true,
            text: greeting.into(),
            kind: ContentKind::Info,
            last_updated: SystemTime::now(),
            revision: 0,
        };
        let (tx, rx) = watch::channel(visual.clone());
        (
            Self {
                visual,
                tx,
                repaint: RepaintSignal::default(),
            },
            rx,
        )
    }

    pub fn subscribe(&self) -> watch::Receiver<OverlayVisual> {
        self.tx.subscribe()
    }

    /// Handle the window connects to be woken on every change.
    pub fn repaint_signal(&self) -> RepaintSignal {
        self.repaint.clone()
    }

    pub fn visual(&self) -> &OverlayVisual {
        &self.visual
    }

    pub fn is_visible(&self) -> bool {
        self.visual.visible
    }

    /// Replaces the content and makes the overlay visible.
    pub fn show(&mut self, kind: ContentKind, text: impl Into<String>) {
        self.visual.visible = true;
        self.visual.kind = kind;
        self.visual.text = text.into();
        self.publish();
    }

    pub fn show_error(&mut self, message: impl AsRef<str>) {
        self.show(ContentKind::Error, format!("Error: {}", message.as_ref()));
    }

    /// No-op when already hidden.
    pub fn hide(&mut self) {
        if self.visual.visible {
            self.visual.visible = false;
            self.publish();
        }
    }

    pub fn toggle(&mut self) {
        self.visual.visible = !self.visual.visible;
        self.publish();
    }

    /// Replaces the text, leaving visibility as is.
    pub fn update_content(&mut self, text: impl Into<String>) {
        self.visual.text = text.into();
        self.publish();
    }

    fn publish(&mut self) {
        self.visual.revision += 1;
        self.visual.last_updated = SystemTime::now();
        self.tx.send_replace(self.visual.clone());
        self.repaint.notify();
    }
}
