//! Retrying invoker: wraps a single LLM call with bounded attempts,
//! per-attempt timeouts and jittered exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::llm_client::{parse_structured, LlmBackend, LlmError, StructuredRequest};
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::{PipelineError, Stage};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: MAX_BACKOFF,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `failed`-th failed attempt (1-based).
    ///
    /// The ceiling doubles per attempt up to `max_delay`; the actual delay is
    /// drawn uniformly from [ceiling/2, ceiling] so concurrent callers that
    /// failed together do not retry together.
    pub fn backoff(&self, failed: u32) -> Duration {
        let exponent = failed.saturating_sub(1).min(16);
        let ceiling = self
            .base_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay);
        let ceiling_ms = ceiling.as_millis() as u64;
        if ceiling_ms == 0 {
            return Duration::ZERO;
        }
        let jittered_ms = rand::thread_rng().gen_range(ceiling_ms / 2..=ceiling_ms);
        Duration::from_millis(jittered_ms)
    }
}

/// Invokes a stage prompt and parses the reply into the stage's schema type.
#[derive(Clone)]
pub struct RetryingInvoker {
    backend: Arc<dyn LlmBackend>,
    policy: RetryPolicy,
}

impl RetryingInvoker {
    pub fn new(backend: Arc<dyn LlmBackend>, policy: RetryPolicy) -> Self {
        let policy = RetryPolicy {
            max_attempts: policy.max_attempts.max(1),
            ..policy
        };
        Self { backend, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Transient failures (timeouts, rate limits, unparseable output) are
    /// retried up to `max_attempts`; permanent ones are returned at once.
    /// Cancellation is observed before every attempt.
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        stage: Stage,
        request: &StructuredRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<T, PipelineError> {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            cancel.checkpoint(stage)?;
            attempt += 1;
            debug!(stage = %stage, attempt, max_attempts, "Invoking LLM");

            match self.attempt::<T>(request).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let backoff = self.policy.backoff(attempt);
                    warn!(
                        stage = %stage,
                        error = %e,
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "LLM attempt failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!(stage = %stage, error = %e, attempts = attempt, "All LLM attempts failed");
                    } else {
                        error!(stage = %stage, error = %e, attempts = attempt, "Permanent LLM failure, not retrying");
                    }
                    return Err(PipelineError::StageInvocation {
                        stage,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        request: &StructuredRequest<'_>,
    ) -> Result<T, LlmError> {
        let timeout = self.policy.attempt_timeout;
        let raw = tokio::time::timeout(timeout, self.backend.complete(request))
            .await
            .map_err(|_| LlmError::Timeout {
                secs: timeout.as_secs(),
            })??;
        parse_structured(&raw)
    }
}
