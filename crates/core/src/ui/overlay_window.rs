//! The overlay window.
//!
//! `OverlayApp` implements `eframe::App` for a small undecorated,
//! always-on-top, transparent window. It mirrors the [`OverlayVisual`]
//! snapshots published by the pipeline and never writes pipeline state.
//! Hidden means nothing is painted and the mouse passes through, so the
//! window never steals focus from the application being looked at.

use super::rendering::{PANEL_FILL, accent_for, draw_selection_border, draw_selection_overlay};
use super::selection::{SelectionEvent, process_drag_event, selection_to_region};
use super::settings::OverlaySettings;
use super::state::{SelectionRequest, SelectionSession, UiMode};
use crate::capture::CaptureRegion;
use crate::overlay::{ContentKind, OverlayVisual};
use eframe::egui;
use egui_commonmark::{CommonMarkCache, CommonMarkViewer};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;
use tokio::sync::watch;

/// Fallback poll for selection requests. Snapshots wake the window directly.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Darkness of the selection surface outside the cutout.
const DIM_ALPHA: u8 = 120;

pub struct OverlayApp {
    visual_rx: watch::Receiver<OverlayVisual>,
    visual: OverlayVisual,
    selection_rx: Receiver<SelectionRequest>,
    mode: UiMode,
    /// Shown under the content, e.g. the hotkey cheat sheet.
    hint: String,
    markdown_cache: CommonMarkCache,
    settings: OverlaySettings,
    /// Last passthrough state sent to the viewport.
    passthrough: Option<bool>,
}

impl OverlayApp {
    pub fn new(
        visual_rx: watch::Receiver<OverlayVisual>,
        selection_rx: Receiver<SelectionRequest>,
        hint: String,
        settings: OverlaySettings,
    ) -> Self {
        let visual = visual_rx.borrow().clone();
        Self {
            visual_rx,
            visual,
            selection_rx,
            mode: UiMode::Overlay,
            hint,
            markdown_cache: CommonMarkCache::default(),
            settings,
            passthrough: None,
        }
    }

    /// Pulls the latest snapshot. Returns false once the pipeline is gone.
    fn sync_visual(&mut self) -> bool {
        match self.visual_rx.has_changed() {
            Ok(true) => {
                self.visual = self.visual_rx.borrow_and_update().clone();
                true
            }
            Ok(false) => true,
            Err(_) => false,
        }
    }

    fn poll_selection_requests(&mut self, ctx: &egui::Context) {
        loop {
            match self.selection_rx.try_recv() {
                Ok(request) => self.start_selection(ctx, request),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn start_selection(&mut self, ctx: &egui::Context, request: SelectionRequest) {
        if matches!(self.mode, UiMode::Selecting(_)) {
            log::debug!("selection already running; rejecting second request");
            let _ = request.reply.send(None);
            return;
        }
        self.remember_placement(ctx);
        ctx.send_viewport_cmd(egui::ViewportCommand::MousePassthrough(false));
        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(true));
        ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
        self.passthrough = Some(false);
        self.mode = UiMode::Selecting(SelectionSession::new(request.reply));
    }

    fn finish_selection(&mut self, ctx: &egui::Context, region: Option<CaptureRegion>) {
        if let UiMode::Selecting(session) = &mut self.mode {
            if let Some(reply) = session.reply.take() {
                let _ = reply.send(region);
            }
        }
        self.mode = UiMode::Overlay;
        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(false));
        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(self.settings.size.into()));
        if let Some(position) = self.settings.position {
            ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(position.into()));
        }
        // Force the passthrough state to be sent again
        self.passthrough = None;
    }

    fn remember_placement(&mut self, ctx: &egui::Context) {
        let (outer, inner) = ctx.input(|i| (i.viewport().outer_rect, i.viewport().inner_rect));
        if let Some(outer) = outer {
            self.settings.position = Some([outer.min.x, outer.min.y]);
        }
        if let Some(inner) = inner {
            self.settings.size = [inner.width(), inner.height()];
        }
    }

    fn apply_passthrough(&mut self, ctx: &egui::Context) {
        let wanted = !self.visual.visible;
        if self.passthrough != Some(wanted) {
            ctx.send_viewport_cmd(egui::ViewportCommand::MousePassthrough(wanted));
            self.passthrough = Some(wanted);
        }
    }

    fn close(&mut self, ctx: &egui::Context) {
        if let UiMode::Overlay = self.mode {
            self.remember_placement(ctx);
        }
        if let Err(e) = self.settings.save() {
            log::warn!("failed to save overlay placement: {}", e);
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    fn render_overlay(&mut self, ctx: &egui::Context) {
        self.apply_passthrough(ctx);

        if !self.visual.visible {
            egui::CentralPanel::default()
                .frame(egui::Frame::default())
                .show(ctx, |_ui| {});
            return;
        }

        let visual = &self.visual;
        let cache = &mut self.markdown_cache;
        let hint = &self.hint;
        let accent = accent_for(visual.kind);

        let panel_frame = egui::Frame::default()
            .fill(PANEL_FILL)
            .stroke(egui::Stroke::new(1.0, accent))
            .corner_radius(10.0)
            .inner_margin(10.0);

        egui::CentralPanel::default().frame(panel_frame).show(ctx, |ui| {
            let title = ui
                .horizontal(|ui| {
                    ui.label(egui::RichText::new("AI Glance").strong().color(accent));
                    if visual.kind == ContentKind::Busy {
                        ui.spinner();
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if visual.kind == ContentKind::Answer && ui.small_button("Copy").clicked() {
                            copy_to_clipboard(&visual.text);
                        }
                    });
                })
                .response;

            // Undecorated window: the title row doubles as the drag handle
            let drag = ui.interact(title.rect, egui::Id::new("overlay_title"), egui::Sense::drag());
            if drag.drag_started() {
                ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
            }

            ui.separator();

            let footer_height = ui.text_style_height(&egui::TextStyle::Small) + 12.0;
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .max_height((ui.available_height() - footer_height).max(0.0))
                .show(ui, |ui| match visual.kind {
                    ContentKind::Answer | ContentKind::Info => {
                        CommonMarkViewer::new().show(ui, cache, &visual.text);
                    }
                    ContentKind::Busy => {
                        ui.label(visual.text.as_str());
                    }
                    ContentKind::Error => {
                        ui.label(egui::RichText::new(&visual.text).color(accent));
                    }
                });

            ui.separator();
            ui.label(egui::RichText::new(hint).small().weak());
        });
    }

    fn render_selection(&mut self, ctx: &egui::Context) {
        let UiMode::Selecting(session) = &mut self.mode else {
            return;
        };
        let mut finished: Option<Option<CaptureRegion>> = None;

        egui::CentralPanel::default()
            .frame(egui::Frame::default())
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let response =
                    ui.interact(rect, egui::Id::new("region_selection"), egui::Sense::drag());

                if process_drag_event(&response, &mut session.start, &mut session.current)
                    == SelectionEvent::Completed
                {
                    if let (Some(start), Some(end)) = (session.start, session.current) {
                        let origin = ctx
                            .input(|i| i.viewport().inner_rect.map(|r| r.min))
                            .unwrap_or(egui::Pos2::ZERO);
                        finished = Some(selection_to_region(
                            egui::Rect::from_two_pos(start, end),
                            origin,
                            ctx.pixels_per_point(),
                        ));
                    }
                }

                if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
                    finished = Some(None);
                }

                let pointer = ctx.pointer_interact_pos().or(session.current);
                match (session.start, pointer) {
                    (Some(start), Some(current)) => {
                        let selection_rect = egui::Rect::from_two_pos(start, current);
                        draw_selection_overlay(ui.painter(), rect, selection_rect, DIM_ALPHA);
                        draw_selection_border(
                            ui.painter(),
                            selection_rect,
                            2.0,
                            egui::Color32::WHITE,
                        );
                    }
                    _ => {
                        ui.painter()
                            .rect_filled(rect, 0.0, egui::Color32::from_black_alpha(DIM_ALPHA));
                    }
                }

                ui.painter().text(
                    rect.center_top() + egui::vec2(0.0, 40.0),
                    egui::Align2::CENTER_TOP,
                    "Drag to select the capture region. Esc cancels.",
                    egui::FontId::proportional(18.0),
                    egui::Color32::WHITE,
                );
            });

        if let Some(region) = finished {
            match region {
                Some(r) => log::debug!("selected region {}", r),
                None => log::debug!("selection cancelled"),
            }
            self.finish_selection(ctx, region);
        }
    }
}

impl eframe::App for OverlayApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0; 4]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Enforce dark mode
        ctx.set_visuals(egui::Visuals::dark());

        if !self.sync_visual() {
            log::debug!("overlay state closed; closing window");
            self.close(ctx);
            return;
        }
        self.poll_selection_requests(ctx);

        match self.mode {
            UiMode::Overlay => {
                self.render_overlay(ctx);
                if self.visual.visible {
                    self.remember_placement(ctx);
                }
            }
            UiMode::Selecting(_) => self.render_selection(ctx),
        }

        ctx.request_repaint_after(POLL_INTERVAL);
    }
}

fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => {
            if let Err(e) = clipboard.set_text(text) {
                log::warn!("failed to copy answer: {}", e);
            }
        }
        Err(e) => log::warn!("clipboard unavailable: {}", e),
    }
}
