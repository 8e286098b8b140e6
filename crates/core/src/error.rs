//! Error types for the ai-glance-core library.
//!
//! [`AppError`] covers every failure a scan cycle can hit. Failures of the AI
//! leg are classified separately in [`AiFailure`] because the retry policy and
//! the overlay message both depend on the class.

use thiserror::Error;

/// Errors that can occur within the ai-glance-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required environment variable was not found.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Screen capture operation failed.
    #[error("Screen capture failed: {0}")]
    Capture(String),

    /// Requested screen/monitor index was not found.
    #[error("Screen not found: index {0}")]
    ScreenNotFound(usize),

    /// Image processing or encoding failed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// The selection area is empty or has zero dimensions.
    #[error("Selection area is empty or invalid")]
    EmptySelection,

    /// The OCR engine could not produce text.
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    /// The AI request failed after the retry policy gave up.
    #[error(transparent)]
    Ai(#[from] AiFailure),

    /// A caller broke an API precondition (e.g. text-only request without text).
    #[error("Contract violation: {0}")]
    Contract(String),

    /// UI-related errors (rendering, window management).
    #[error("UI error: {0}")]
    Ui(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a screen capture error with the given message.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Creates an image processing error with the given message.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Creates a text extraction error with the given message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Creates a contract violation error with the given message.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }

    /// Short text suitable for the overlay.
    pub fn user_message(&self) -> String {
        match self {
            Self::Ai(failure) => failure.user_message(),
            other => other.to_string(),
        }
    }
}

/// Classified failure of a single AI request.
///
/// Only [`AiFailure::Transient`] is ever retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiFailure {
    /// Timeout, connection reset, 5xx or 429.
    #[error("Temporary network failure: {0}")]
    Transient(String),

    /// The credential was rejected (401/403).
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Any other 4xx response.
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never left the client: bad key format, bad URL.
    #[error("Request could not be sent: {0}")]
    Client(String),

    /// The response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The pipeline shut down while the request was outstanding.
    #[error("Request cancelled")]
    Cancelled,
}

impl AiFailure {
    /// Returns true if another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Message rendered in the overlay.
    ///
    /// Authentication problems get their own wording so the user fixes the
    /// token instead of pressing scan again.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(detail) => format!(
                "Authentication failed ({detail}). Check the API token in your configuration."
            ),
            Self::Malformed(detail) => format!("Internal error: unexpected AI response ({detail})"),
            other => other.to_string(),
        }
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
