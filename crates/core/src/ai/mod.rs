//! AI request assembly and delivery.
//!
//! - [`request`]: provider-neutral [`AiRequest`] and the pure [`RequestBuilder`]
//! - [`client`]: [`AiClient`] with timeout, retry and cancellation
//! - [`chat_completions`]: OpenAI-compatible HTTP transport
//! - [`gemini`]: Google Gemini transport

pub mod chat_completions;
pub mod client;
pub mod gemini;
pub mod request;

pub use chat_completions::ChatCompletionsTransport;
pub use client::{AiClient, AiResponse, AiTransport, RetryPolicy, TransportReply};
pub use gemini::GeminiTransport;
pub use request::{AiMode, AiRequest, ChatMessage, ImagePayload, RequestBuilder, Role};

use crate::config::{Config, ProviderKind};
use crate::error::Result;
use std::sync::Arc;

/// Creates the transport selected by `config.provider`.
pub fn transport_for(config: &Config) -> Result<Arc<dyn AiTransport>> {
    let transport: Arc<dyn AiTransport> = match config.provider {
        ProviderKind::ChatCompletions => Arc::new(ChatCompletionsTransport::new(
            config.endpoint.clone(),
            config.api_key.clone(),
            config.temperature,
            config.max_tokens,
        )),
        ProviderKind::Gemini => {
            Arc::new(GeminiTransport::new(&config.api_key, &config.model_name)?)
        }
    };
    log::info!("AI provider: {} (model {})", transport.name(), config.model_name);
    Ok(transport)
}

/// Client with the retry policy from `config`.
pub fn client_for(config: &Config) -> Result<AiClient> {
    let policy = RetryPolicy {
        max_retries: config.max_retries,
        base_backoff: config.retry_backoff,
    };
    Ok(AiClient::new(transport_for(config)?, policy))
}
