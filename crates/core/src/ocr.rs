//! Text extraction for text-only mode.
//!
//! [`TesseractExtractor`] pipes the captured PNG through the `tesseract`
//! command line tool, so no OCR model is linked into the binary.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Produces plain text from encoded image bytes.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image_bytes: &[u8]) -> Result<String>;
}

pub struct TesseractExtractor {
    binary: String,
    languages: String,
}

impl TesseractExtractor {
    /// `languages` uses tesseract's `eng+vie` syntax.
    pub fn new(languages: impl Into<String>) -> Self {
        Self {
            binary: "tesseract".to_string(),
            languages: languages.into(),
        }
    }

    /// Overrides the executable (for non-PATH installs).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract_text(&self, image_bytes: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.languages])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::extraction(format!("Failed to start {}: {}", self.binary, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::extraction("tesseract stdin unavailable"))?;
        stdin
            .write_all(image_bytes)
            .await
            .map_err(|e| AppError::extraction(format!("Failed to feed image to OCR: {}", e)))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AppError::extraction(format!("OCR process failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::extraction(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(normalize_text(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Trims each line and drops blank ones.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
