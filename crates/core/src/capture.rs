//! Screen capture functionality.
//!
//! The pipeline only sees the [`CaptureProvider`] trait. [`ScreenCapturer`]
//! is the production implementation on top of the `screenshots` crate,
//! supporting X11 and Wayland on Linux as well as Windows and macOS.
//!
//! # Example
//!
//! ```ignore
//! use ai_glance_core::capture::{CaptureProvider, ScreenCapturer};
//!
//! let capturer = ScreenCapturer::new(0)?;
//! for screen in capturer.list_screen() {
//!     println!("{}", screen);
//! }
//! let shot = capturer.capture(None).await?;
//! ```

use crate::error::{AppError, Result};
use crate::image_processing::ImageProcessor;
use async_trait::async_trait;
use image::DynamicImage;
use screenshots::Screen;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

/// A rectangle in global screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for CaptureRegion {
    type Err = String;

    /// Parses `x,y,width,height`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("expected x,y,width,height but got '{s}'"));
        }
        let bad = |part: &str| format!("invalid number '{part}' in region '{s}'");
        let region = CaptureRegion {
            x: parts[0].parse().map_err(|_| bad(parts[0]))?,
            y: parts[1].parse().map_err(|_| bad(parts[1]))?,
            width: parts[2].parse().map_err(|_| bad(parts[2]))?,
            height: parts[3].parse().map_err(|_| bad(parts[3]))?,
        };
        if region.width == 0 || region.height == 0 {
            return Err(format!("region '{s}' has zero area"));
        }
        Ok(region)
    }
}

/// One grabbed frame, already encoded as PNG.
#[derive(Clone, Debug)]
pub struct CaptureResult {
    pub image_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: SystemTime,
}

/// Produces a frame for an optional region (full screen when `None`).
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    async fn capture(&self, region: Option<CaptureRegion>) -> Result<CaptureResult>;
}

/// Lets the user pick a capture region. `Ok(None)` means the selection was
/// cancelled and the current region stays in place.
#[async_trait]
pub trait RegionSelector: Send + Sync {
    async fn select_region(&self) -> Result<Option<CaptureRegion>>;
}

/// Screen capturer that provides multi-monitor screenshot capabilities.
///
/// Screens are enumerated again on every capture so the blocking grab can run
/// on a worker thread without holding platform handles across threads.
pub struct ScreenCapturer {
    monitor: usize,
    descriptions: Vec<String>,
}

impl ScreenCapturer {
    /// Detects available screens and checks that `monitor` exists.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Capture`] if screen enumeration fails or no screen
    /// is detected, and [`AppError::ScreenNotFound`] for a bad index.
    pub fn new(monitor: usize) -> Result<Self> {
        let screens = Screen::all()
            .map_err(|e| AppError::capture(format!("Failed to enumerate screens: {}", e)))?;

        if screens.is_empty() {
            return Err(AppError::capture("No screens detected"));
        }
        if monitor >= screens.len() {
            return Err(AppError::ScreenNotFound(monitor));
        }

        let descriptions = screens
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "Monitor {}: {}x{} at ({}, {}) (scale: {})",
                    i,
                    s.display_info.width,
                    s.display_info.height,
                    s.display_info.x,
                    s.display_info.y,
                    s.display_info.scale_factor
                )
            })
            .collect();

        Ok(Self { monitor, descriptions })
    }

    /// Lists available screens with their dimensions and metadata.
    pub fn list_screen(&self) -> Vec<String> {
        self.descriptions.clone()
    }

    fn grab(monitor: usize, region: Option<CaptureRegion>) -> Result<DynamicImage> {
        let captured = match region {
            None => {
                let screens = Screen::all()
                    .map_err(|e| AppError::capture(format!("Failed to enumerate screens: {}", e)))?;
                let screen = screens.get(monitor).ok_or(AppError::ScreenNotFound(monitor))?;
                screen
                    .capture()
                    .map_err(|e| AppError::capture(format!("Failed to capture screen: {}", e)))?
            }
            Some(r) => {
                // capture_area works in coordinates relative to the owning screen
                let screen = Screen::from_point(r.x, r.y)
                    .map_err(|e| AppError::capture(format!("No screen contains {}: {}", r, e)))?;
                screen
                    .capture_area(
                        r.x - screen.display_info.x,
                        r.y - screen.display_info.y,
                        r.width,
                        r.height,
                    )
                    .map_err(|e| AppError::capture(format!("Failed to capture region: {}", e)))?
            }
        };

        // Convert the backend image to image::DynamicImage
        let width = captured.width();
        let height = captured.height();
        let rgba_data = captured.into_raw();

        let img_buffer = image::ImageBuffer::from_raw(width, height, rgba_data)
            .ok_or_else(|| AppError::capture("Failed to create image buffer"))?;

        Ok(DynamicImage::ImageRgba8(img_buffer))
    }
}

#[async_trait]
impl CaptureProvider for ScreenCapturer {
    async fn capture(&self, region: Option<CaptureRegion>) -> Result<CaptureResult> {
        let monitor = self.monitor;
        tokio::task::spawn_blocking(move || -> Result<CaptureResult> {
            let image = Self::grab(monitor, region)?;
            let timestamp = SystemTime::now();
            let image_bytes = ImageProcessor::encode_png(&image)?;
            log::debug!(
                "captured {}x{} frame ({} PNG bytes)",
                image.width(),
                image.height(),
                image_bytes.len()
            );
            Ok(CaptureResult {
                image_bytes,
                width: image.width(),
                height: image.height(),
                timestamp,
            })
        })
        .await
        .map_err(|e| AppError::capture(format!("Capture worker failed: {}", e)))?
    }
}
