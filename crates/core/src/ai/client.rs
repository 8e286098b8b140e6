//! AI client: timeout, retry and cancellation around an [`AiTransport`].

use super::request::AiRequest;
use crate::error::AiFailure;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Raw answer from a single successful attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportReply {
    pub text: String,
    pub tokens_used: Option<u32>,
}

/// One network round trip to a provider. Implementations classify their own
/// failures; they never retry.
#[async_trait]
pub trait AiTransport: Send + Sync {
    async fn execute(&self, request: &AiRequest) -> Result<TransportReply, AiFailure>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

#[derive(Clone, Debug, PartialEq)]
pub struct AiResponse {
    pub answer_text: String,
    pub tokens_used: Option<u32>,
    pub latency: Duration,
    pub attempts: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one, transient failures only.
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (zero-based): `base * 2^retry`.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << retry.min(16))
    }
}

/// Maps an HTTP status to a failure class.
pub fn failure_for_status(status: u16, detail: impl Into<String>) -> AiFailure {
    let detail = detail.into();
    match status {
        401 | 403 => AiFailure::Auth(format!("HTTP {status}: {detail}")),
        429 | 500..=599 => AiFailure::Transient(format!("HTTP {status}: {detail}")),
        _ => AiFailure::Rejected {
            status,
            message: detail,
        },
    }
}

pub struct AiClient {
    transport: Arc<dyn AiTransport>,
    policy: RetryPolicy,
}

impl AiClient {
    pub fn new(transport: Arc<dyn AiTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Sends `request`, bounding every attempt by `timeout`.
    ///
    /// Transient failures are retried up to the policy bound with exponential
    /// backoff; anything else is returned on the spot. Cancelling `cancel`
    /// aborts the outstanding attempt or backoff immediately.
    pub async fn send(
        &self,
        request: &AiRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<AiResponse, AiFailure> {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AiFailure::Cancelled),
                result = tokio::time::timeout(timeout, self.transport.execute(request)) => {
                    match result {
                        Ok(reply) => reply,
                        Err(_) => Err(AiFailure::Transient(format!(
                            "no response within {}s",
                            timeout.as_secs_f32()
                        ))),
                    }
                }
            };

            match outcome {
                Ok(reply) if reply.text.trim().is_empty() => {
                    return Err(AiFailure::Malformed("empty answer".to_string()));
                }
                Ok(reply) => {
                    return Ok(AiResponse {
                        answer_text: reply.text,
                        tokens_used: reply.tokens_used,
                        latency: started.elapsed(),
                        attempts: attempt,
                    });
                }
                Err(failure) if failure.is_transient() && attempt <= self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt - 1);
                    log::warn!(
                        "{} attempt {} failed ({}); retrying in {:?}",
                        self.transport.name(),
                        attempt,
                        failure,
                        delay
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(AiFailure::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}
