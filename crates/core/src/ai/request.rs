//! Provider-neutral request model and the builder that assembles it.
//!
//! [`RequestBuilder::build`] is pure: the same context, capture, mode and
//! extracted text always yield an identical [`AiRequest`].

use crate::capture::CaptureResult;
use crate::context::ConversationContext;
use crate::error::{AppError, Result};
use crate::image_processing::PNG_MIME;
use std::fmt;
use std::str::FromStr;

pub const VISION_SYSTEM_PROMPT: &str = "You are an AI assistant. \
The user sends a screenshot containing questions. \
Read, analyze, and answer each question accurately and concisely.";

pub const TEXT_SYSTEM_PROMPT: &str = "You are an AI assistant. \
The user provides extracted text from their screen. \
Analyze and provide accurate answers.";

pub const VISION_INSTRUCTION: &str = "Please read and answer all questions in this image.";

pub const TEXT_INSTRUCTION: &str = "Please answer the questions above.";

/// Sent in place of OCR output when nothing readable was found.
pub const NO_TEXT_PLACEHOLDER: &str = "(no text detected on screen)";

/// How the screen reaches the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AiMode {
    /// The screenshot itself is attached.
    Vision,
    /// Only OCR text is sent.
    TextOnly,
}

impl FromStr for AiMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vision" | "image" => Ok(Self::Vision),
            "text" | "text-only" | "textonly" | "ocr" => Ok(Self::TextOnly),
            other => Err(format!("unknown AI mode '{other}' (expected vision or text)")),
        }
    }
}

impl fmt::Display for AiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vision => f.write_str("vision"),
            Self::TextOnly => f.write_str("text"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Encoded image attached to the final user turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// One fully assembled request. Transports attach `image` to the last
/// user message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AiRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub image: Option<ImagePayload>,
}

impl AiRequest {
    /// Text of the new user turn, recorded in the conversation on success.
    pub fn question(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct RequestBuilder {
    model: String,
    vision_system_prompt: String,
    text_system_prompt: String,
    vision_instruction: String,
    text_instruction: String,
}

impl RequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            vision_system_prompt: VISION_SYSTEM_PROMPT.to_string(),
            text_system_prompt: TEXT_SYSTEM_PROMPT.to_string(),
            vision_instruction: VISION_INSTRUCTION.to_string(),
            text_instruction: TEXT_INSTRUCTION.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Assembles the request: system prompt, prior exchanges oldest first,
    /// then the new user turn.
    ///
    /// # Errors
    ///
    /// [`AppError::Contract`] when `mode` is [`AiMode::TextOnly`] and no
    /// extracted text is supplied.
    pub fn build(
        &self,
        context: &ConversationContext,
        capture: &CaptureResult,
        mode: AiMode,
        extracted_text: Option<&str>,
    ) -> Result<AiRequest> {
        let system_prompt = match mode {
            AiMode::Vision => &self.vision_system_prompt,
            AiMode::TextOnly => &self.text_system_prompt,
        };

        let mut messages = Vec::with_capacity(2 + context.len() * 2);
        messages.push(ChatMessage::new(Role::System, system_prompt.as_str()));
        for exchange in context.iter() {
            messages.push(ChatMessage::new(Role::User, exchange.question.as_str()));
            messages.push(ChatMessage::new(Role::Assistant, exchange.answer.as_str()));
        }

        let image = match mode {
            AiMode::Vision => {
                messages.push(ChatMessage::new(Role::User, self.vision_instruction.as_str()));
                Some(ImagePayload {
                    mime_type: PNG_MIME.to_string(),
                    bytes: capture.image_bytes.clone(),
                })
            }
            AiMode::TextOnly => {
                let text = extracted_text.ok_or_else(|| {
                    AppError::contract("text-only request built without extracted text")
                })?;
                messages.push(ChatMessage::new(
                    Role::User,
                    format!("Screen content:\n\n{}\n\n{}", text, self.text_instruction),
                ));
                None
            }
        };

        Ok(AiRequest {
            model: self.model.clone(),
            messages,
            image,
        })
    }
}
