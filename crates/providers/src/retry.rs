//! Retrying completer: bounded attempts with exponential backoff on rate limits.
//!
//! Every attempt is classified into an [`AttemptOutcome`]. Only rate-limited
//! attempts are retried; anything else ends the call at once. The whole call,
//! backoff sleeps included, runs under an overall deadline and can be
//! cancelled by the caller.

use finguru_core::error::ProviderError;
use finguru_core::message::Message;
use finguru_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Per-call knobs for a completion.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Total attempts allowed, the first one included.
    pub max_retries: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: Some(600),
            max_retries: 3,
        }
    }
}

/// Typed result of a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(String),
    /// Rate limited; worth trying again after a pause.
    Retryable(ProviderError),
    /// Any other failure; retrying will not help.
    Terminal(ProviderError),
}

impl AttemptOutcome {
    fn classify(result: Result<String, ProviderError>) -> Self {
        match result {
            Ok(text) => Self::Success(text),
            Err(e) if e.is_rate_limited() => Self::Retryable(e),
            Err(e) => Self::Terminal(e),
        }
    }
}

/// Why a completion call produced no text.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Still rate limited after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: ProviderError,
    },

    #[error("Completion failed: {0}")]
    Rejected(#[source] ProviderError),

    #[error("Completion cancelled")]
    Cancelled,

    #[error("Completion exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

/// Wraps a [`Provider`] with the retry state machine.
pub struct RetryingCompleter {
    provider: Arc<dyn Provider>,
    model: String,
    initial_backoff: Duration,
    deadline: Duration,
}

impl RetryingCompleter {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            initial_backoff: Duration::from_secs(1),
            deadline: Duration::from_secs(60),
        }
    }

    /// Build from the `[retry]` section and the default provider's model.
    ///
    /// A `default_model` under `[providers.<default_provider>]` takes
    /// precedence over the top-level one.
    pub fn from_config(provider: Arc<dyn Provider>, config: &finguru_config::AppConfig) -> Self {
        Self::new(provider, config.active_model())
            .with_initial_backoff(Duration::from_millis(config.retry.initial_backoff_ms))
            .with_deadline(Duration::from_secs(config.retry.request_timeout_secs))
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn attempt(&self, request: ProviderRequest) -> AttemptOutcome {
        let result = self
            .provider
            .complete(request)
            .await
            .map(|response| response.message.content);
        AttemptOutcome::classify(result)
    }

    /// Run the backoff loop to completion, ignoring deadline and cancellation.
    async fn run(
        &self,
        request: ProviderRequest,
        max_attempts: u32,
    ) -> Result<String, CompletionError> {
        let mut attempt = 1;
        let mut delay = self.initial_backoff;

        loop {
            debug!(provider = %self.provider.name(), attempt, max_attempts, "Completion attempt");

            match self.attempt(request.clone()).await {
                AttemptOutcome::Success(text) => return Ok(text),
                AttemptOutcome::Terminal(e) => {
                    warn!(
                        provider = %self.provider.name(),
                        attempt,
                        error = %e,
                        "Completion failed"
                    );
                    return Err(CompletionError::Rejected(e));
                }
                AttemptOutcome::Retryable(e) if attempt >= max_attempts => {
                    warn!(
                        attempts = attempt,
                        error = %e,
                        "Rate limited on final attempt, giving up"
                    );
                    return Err(CompletionError::RetriesExhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                AttemptOutcome::Retryable(e) => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }

    /// Complete `messages`, retrying rate-limited attempts with doubling backoff.
    ///
    /// At least one attempt is always made, even when `max_retries` is zero.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> Result<String, CompletionError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        let max_attempts = options.max_retries.max(1);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CompletionError::Cancelled),
            result = tokio::time::timeout(self.deadline, self.run(request, max_attempts)) => {
                result.unwrap_or(Err(CompletionError::DeadlineExceeded(self.deadline)))
            }
        }
    }
}
