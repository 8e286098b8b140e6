//! Selection handling and coordinate mapping.
//!
//! This module contains logic for handling user selection interactions
//! and mapping a selection in UI points to a capture region in physical
//! screen pixels.

use crate::capture::CaptureRegion;
use eframe::egui;

/// Minimum distance (in pixels) for a drag to be considered a valid selection.
pub const MIN_SELECTION_DISTANCE: f32 = 10.0;

/// Determines if a drag operation should be considered a valid selection.
///
/// A selection is valid if the start and end points are far enough apart
/// to indicate intentional selection rather than an accidental click.
pub fn is_valid_selection(start: egui::Pos2, end: egui::Pos2) -> bool {
    start.distance(end) > MIN_SELECTION_DISTANCE
}

/// Result of processing selection input events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEvent {
    /// User started a new selection drag.
    Started,
    /// User is actively dragging.
    Dragging,
    /// User completed a valid selection.
    Completed,
    /// User completed a drag but it was too small/invalid.
    Cancelled,
    /// No selection event occurred.
    None,
}

/// Processes drag events and returns the selection state change.
///
/// # Arguments
/// * `response` - The egui response from the interaction area
/// * `start` - Current selection start position (mutable)
/// * `current` - Current selection end position (mutable)
pub fn process_drag_event(
    response: &egui::Response,
    start: &mut Option<egui::Pos2>,
    current: &mut Option<egui::Pos2>,
) -> SelectionEvent {
    if response.drag_started() {
        *start = response.interact_pointer_pos();
        *current = response.interact_pointer_pos();
        return SelectionEvent::Started;
    }

    if response.dragged() {
        *current = response.interact_pointer_pos();
        return SelectionEvent::Dragging;
    }

    if response.drag_stopped() {
        if let (Some(s), Some(e)) = (*start, *current) {
            if is_valid_selection(s, e) {
                return SelectionEvent::Completed;
            }
            *start = None;
            *current = None;
            return SelectionEvent::Cancelled;
        }
    }

    SelectionEvent::None
}

/// Maps a selection inside the viewport to global physical pixels.
///
/// `viewport_origin` is the viewport's top-left corner in global points.
/// Returns `None` when the rounded region has no area.
pub fn selection_to_region(
    selection: egui::Rect,
    viewport_origin: egui::Pos2,
    pixels_per_point: f32,
) -> Option<CaptureRegion> {
    let x = ((viewport_origin.x + selection.min.x) * pixels_per_point).round() as i32;
    let y = ((viewport_origin.y + selection.min.y) * pixels_per_point).round() as i32;
    let width = (selection.width() * pixels_per_point).round() as u32;
    let height = (selection.height() * pixels_per_point).round() as u32;

    if width == 0 || height == 0 {
        return None;
    }
    Some(CaptureRegion { x, y, width, height })
}
