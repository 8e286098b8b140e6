use super::client::{failure_for_status, AiTransport, TransportReply};
use super::request::{AiRequest, Role as ChatRole};
use crate::error::{AiFailure, AppError, Result};
use crate::image_processing::ImageProcessor;
use async_trait::async_trait;
use gemini_rust::{Blob, ClientError, Content, Gemini, Message, Part, Role};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

pub struct GeminiTransport {
    client: Gemini,
}

impl GeminiTransport {
    pub fn new(api_key: &str, model_name: &str) -> Result<Self> {
        // Set the base URL explicitly to avoid the BadScheme error
        let base_url = url::Url::parse(GEMINI_BASE_URL)
            .map_err(|e| AppError::Config(format!("Invalid base URL: {}", e)))?;

        let model_name = if model_name.starts_with("models/") {
            model_name.to_string()
        } else {
            format!("models/{}", model_name)
        };
        let model_url = format!("{}{}", GEMINI_BASE_URL, model_name);

        let client = Gemini::with_model_and_base_url(api_key, model_url, base_url)
            .map_err(|e| AppError::Config(format!("Failed to create Gemini client: {}", e)))?;

        Ok(Self { client })
    }
}

fn text_part(text: &str) -> Part {
    Part::Text {
        text: text.to_string(),
        thought: None,
        thought_signature: None,
    }
}

fn message(role: Role, parts: Vec<Part>) -> Message {
    Message {
        role: role.clone(),
        content: Content {
            role: Some(role),
            parts: Some(parts),
        },
    }
}

/// Maps a Gemini client error onto the retry classes.
///
/// HTTP failures go through [`failure_for_status`] so Gemini is retried like
/// any other HTTP provider. Connection and streaming failures are transient.
pub fn classify_client_error(error: &ClientError) -> AiFailure {
    match error {
        ClientError::BadResponse { code, description } => failure_for_status(
            *code,
            description.clone().unwrap_or_else(|| "no description".to_string()),
        ),
        ClientError::PerformRequest { source, .. }
        | ClientError::PerformRequestNew { source }
        | ClientError::DecodeResponse { source } => AiFailure::Transient(source.to_string()),
        ClientError::BadPart { .. } | ClientError::OperationTimeout { .. } => {
            AiFailure::Transient(error.to_string())
        }
        ClientError::Deserialize { source } => AiFailure::Malformed(source.to_string()),
        ClientError::InvalidApiKey { .. } => AiFailure::Auth(error.to_string()),
        other => AiFailure::Client(other.to_string()),
    }
}

#[async_trait]
impl AiTransport for GeminiTransport {
    async fn execute(&self, request: &AiRequest) -> std::result::Result<TransportReply, AiFailure> {
        let last_user = request.messages.iter().rposition(|m| m.role == ChatRole::User);

        let mut system_prompt = String::new();
        let mut messages = Vec::with_capacity(request.messages.len());
        for (index, entry) in request.messages.iter().enumerate() {
            match entry.role {
                ChatRole::System => system_prompt.push_str(&entry.content),
                ChatRole::Assistant => {
                    messages.push(message(Role::Model, vec![text_part(&entry.content)]))
                }
                ChatRole::User => {
                    let mut parts = vec![text_part(&entry.content)];
                    if let (Some(image), true) = (&request.image, Some(index) == last_user) {
                        parts.push(Part::InlineData {
                            inline_data: Blob {
                                mime_type: image.mime_type.clone(),
                                data: ImageProcessor::to_base64(&image.bytes),
                            },
                            media_resolution: None,
                        });
                    }
                    messages.push(message(Role::User, parts));
                }
            }
        }

        let mut builder = self.client.generate_content().with_messages(messages);
        if !system_prompt.trim().is_empty() {
            builder = builder.with_system_prompt(&system_prompt);
        }

        let response = builder
            .execute()
            .await
            .map_err(|e| classify_client_error(&e))?;

        // Concatenate answer parts, skipping thinking output
        let text: String = response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.as_ref())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| match part {
                        Part::Text { text, thought, .. } if *thought != Some(true) => {
                            Some(text.as_str())
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AiFailure::Malformed("No text response received from Gemini".to_string()));
        }

        Ok(TransportReply {
            text,
            tokens_used: None,
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
