//! UI rendering helpers.
//!
//! Drawing functions shared by the overlay panel and the region selection
//! surface: the dimmed cutout, the selection border and per-content colors.

use crate::overlay::ContentKind;
use eframe::egui;

/// Background of the overlay panel.
pub const PANEL_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(24, 24, 28, 235);

/// Draws the dark overlay with a transparent "cutout" for the selection area.
///
/// Creates a visual effect where the selected region is clear/bright while
/// the rest of the screen is dimmed, helping users focus on their selection.
///
/// # Arguments
/// * `painter` - The egui painter to draw with
/// * `screen_rect` - The full screen rectangle
/// * `selection_rect` - The selected area to keep clear
/// * `alpha` - Darkness level (0-255, higher = darker)
pub fn draw_selection_overlay(
    painter: &egui::Painter,
    screen_rect: egui::Rect,
    selection_rect: egui::Rect,
    alpha: u8,
) {
    let color = egui::Color32::from_black_alpha(alpha);

    // Top region (above selection)
    painter.rect_filled(
        egui::Rect::from_min_max(
            screen_rect.min,
            egui::pos2(screen_rect.max.x, selection_rect.min.y),
        ),
        0.0,
        color,
    );

    // Bottom region (below selection)
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(screen_rect.min.x, selection_rect.max.y),
            screen_rect.max,
        ),
        0.0,
        color,
    );

    // Left region (left of selection, between top and bottom)
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(screen_rect.min.x, selection_rect.min.y),
            egui::pos2(selection_rect.min.x, selection_rect.max.y),
        ),
        0.0,
        color,
    );

    // Right region (right of selection, between top and bottom)
    painter.rect_filled(
        egui::Rect::from_min_max(
            egui::pos2(selection_rect.max.x, selection_rect.min.y),
            egui::pos2(screen_rect.max.x, selection_rect.max.y),
        ),
        0.0,
        color,
    );
}

/// Draws a border around the selection rectangle.
///
/// # Arguments
/// * `painter` - The egui painter to draw with
/// * `selection_rect` - The selected area
/// * `stroke_width` - Width of the border line
/// * `color` - Color of the border
pub fn draw_selection_border(
    painter: &egui::Painter,
    selection_rect: egui::Rect,
    stroke_width: f32,
    color: egui::Color32,
) {
    painter.rect_stroke(
        selection_rect,
        0.0,
        egui::Stroke::new(stroke_width, color),
        egui::StrokeKind::Middle,
    );
}

/// Accent color for the panel title and border.
pub fn accent_for(kind: ContentKind) -> egui::Color32 {
    match kind {
        ContentKind::Info => egui::Color32::from_rgb(140, 170, 220),
        ContentKind::Busy => egui::Color32::from_rgb(230, 190, 90),
        ContentKind::Answer => egui::Color32::from_rgb(110, 200, 140),
        ContentKind::Error => egui::Color32::from_rgb(235, 100, 100),
    }
}
