//! Image encoding utilities.
//!
//! Frames are encoded as PNG once, right after capture. The AI transports
//! then wrap the same bytes as base64 (Gemini inline data) or as a
//! `data:` URI (chat completions `image_url`).

use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

pub const PNG_MIME: &str = "image/png";

/// Image processing utilities for the capture workflow.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Encodes a DynamicImage to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EmptySelection`] for a zero-sized image and
    /// [`AppError::ImageProcessing`] if encoding fails.
    pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(AppError::EmptySelection);
        }

        let mut buffer: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| AppError::image(format!("Failed to encode image: {}", e)))?;

        Ok(buffer)
    }

    /// Base64 of already-encoded image bytes.
    pub fn to_base64(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }

    /// `data:<mime>;base64,<payload>` form used by `image_url` message parts.
    pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
        format!("data:{};base64,{}", mime_type, Self::to_base64(bytes))
    }
}
