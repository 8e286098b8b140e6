use super::client::{failure_for_status, AiTransport, TransportReply};
use super::request::{AiRequest, Role};
use crate::error::AiFailure;
use crate::image_processing::ImageProcessor;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

/// Longest error body carried into a failure message.
const MAX_ERROR_DETAIL: usize = 300;

/// OpenAI-compatible `/chat/completions` transport (GitHub Models by default).
pub struct ChatCompletionsTransport {
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u32>,
}

impl ChatCompletionsTransport {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            temperature,
            max_tokens,
            client: Client::new(),
        }
    }

    /// JSON body for `request`. The image, if any, becomes an `image_url`
    /// part of the last user message.
    pub fn build_payload(&self, request: &AiRequest) -> Value {
        let last_user = request.messages.iter().rposition(|m| m.role == Role::User);

        let messages: Vec<Value> = request
            .messages
            .iter()
            .enumerate()
            .map(|(index, message)| match (&request.image, Some(index) == last_user) {
                (Some(image), true) => json!({
                    "role": message.role.as_str(),
                    "content": [
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": ImageProcessor::data_uri(&image.mime_type, &image.bytes)
                            }
                        },
                        { "type": "text", "text": message.content }
                    ]
                }),
                _ => json!({
                    "role": message.role.as_str(),
                    "content": message.content
                }),
            })
            .collect();

        json!({
            "model": request.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        })
    }
}

/// Extracts the answer text from a 2xx body.
pub fn parse_completion(body: &str) -> Result<TransportReply, AiFailure> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| AiFailure::Malformed(format!("invalid JSON: {}", e)))?;

    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            AiFailure::Malformed("response has no choices[0].message.content".to_string())
        })?;

    Ok(TransportReply {
        text,
        tokens_used: parsed.usage.and_then(|u| u.total_tokens),
    })
}

/// Prefers `error.message` from a JSON error body, falling back to the raw
/// (truncated) text.
fn error_detail(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.pointer("/error/message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });
    let detail = message.unwrap_or_else(|| body.trim().to_string());
    detail.chars().take(MAX_ERROR_DETAIL).collect()
}

#[async_trait]
impl AiTransport for ChatCompletionsTransport {
    async fn execute(&self, request: &AiRequest) -> Result<TransportReply, AiFailure> {
        let body = self.build_payload(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiFailure::Transient(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AiFailure::Transient(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(failure_for_status(status.as_u16(), error_detail(&text)));
        }

        parse_completion(&text)
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::request::{ChatMessage, ImagePayload};

    fn transport() -> ChatCompletionsTransport {
        ChatCompletionsTransport::new(
            "https://example.invalid/chat/completions",
            "token",
            0.3,
            2000,
        )
    }

    fn request(image: Option<ImagePayload>) -> AiRequest {
        AiRequest {
            model: "openai/gpt-4o".into(),
            messages: vec![
                ChatMessage::new(Role::System, "sys"),
                ChatMessage::new(Role::User, "old question"),
                ChatMessage::new(Role::Assistant, "old answer"),
                ChatMessage::new(Role::User, "new question"),
            ],
            image,
        }
    }

    #[test]
    fn image_attaches_to_last_user_message_only() {
        let payload = transport().build_payload(&request(Some(ImagePayload {
            mime_type: "image/png".into(),
            bytes: b"abc".to_vec(),
        })));

        assert_eq!(payload["model"], "openai/gpt-4o");
        assert_eq!(payload["max_tokens"], 2000);
        assert_eq!(payload["messages"][1]["content"], "old question");
        let parts = payload["messages"][3]["content"].as_array().unwrap();
        assert_eq!(parts[0]["image_url"]["url"], "data:image/png;base64,YWJj");
        assert_eq!(parts[1]["text"], "new question");
    }

    #[test]
    fn text_request_has_plain_string_content() {
        let payload = transport().build_payload(&request(None));
        assert_eq!(payload["messages"][3]["role"], "user");
        assert_eq!(payload["messages"][3]["content"], "new question");
    }

    #[test]
    fn parses_answer_and_usage() {
        let body = concat!(
            r#"{"choices":[{"message":{"role":"assistant","content":"42"}}],"#,
            r#""usage":{"total_tokens":17}}"#
        );
        let reply = parse_completion(body).unwrap();
        assert_eq!(reply.text, "42");
        assert_eq!(reply.tokens_used, Some(17));
    }

    #[test]
    fn missing_choices_is_malformed() {
        assert!(matches!(parse_completion(r#"{"choices":[]}"#), Err(AiFailure::Malformed(_))));
        assert!(matches!(parse_completion("<html>"), Err(AiFailure::Malformed(_))));
    }

    #[test]
    fn error_detail_prefers_json_message() {
        assert_eq!(error_detail(r#"{"error":{"message":"Bad credentials"}}"#), "Bad credentials");
        assert_eq!(error_detail("  gateway timeout "), "gateway timeout");
    }
}
