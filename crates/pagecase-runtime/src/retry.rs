//! Generation client with bounded retry and backoff.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use pagecase_protocols::error::GenerationError;
use pagecase_protocols::generator::{GenerationRequest, TextGenerator};

use crate::prompt::{Prompt, PromptStage};

/// Lowest sampling temperature the client will send.
pub const MIN_TEMPERATURE: f32 = 0.3;
/// Highest sampling temperature the client will send.
pub const MAX_TEMPERATURE: f32 = 0.5;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub base_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
    /// Add jitter to delays.
    pub jitter: bool,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
            attempt_timeout: Duration::from_secs(90),
        }
    }
}

impl RetryConfig {
    /// Calculate the delay after the given (0-based) failed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let delay = delay.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter {
            let jitter = rand_jitter(delay * 0.1);
            (delay + jitter).max(0.0) as u64
        } else {
            delay as u64
        };

        Duration::from_millis(delay_ms)
    }

    /// Delay before retrying after `error`. A server-provided retry-after
    /// hint wins over backoff but is still capped by `max_delay`.
    fn delay_after(&self, attempt: u32, error: &GenerationError) -> Duration {
        match error {
            GenerationError::RateLimited {
                retry_after_seconds: Some(secs),
            } => Duration::from_secs(*secs).min(self.max_delay),
            _ => self.delay_for_attempt(attempt),
        }
    }
}

/// Simple jitter using system time.
fn rand_jitter(max: f64) -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / u32::MAX as f64) * max * 2.0 - max
}

/// A failed attempt that will be retried.
#[derive(Debug, Clone)]
pub struct RetryNotice {
    /// 1-based number of the attempt that failed.
    pub attempt: u32,
    pub max_attempts: u32,
    pub error: GenerationError,
    pub delay: Duration,
}

impl fmt::Display for RetryNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retry: attempt {}/{} failed ({}), retrying in {}ms",
            self.attempt,
            self.max_attempts,
            self.error,
            self.delay.as_millis()
        )
    }
}

/// Clamp a requested temperature into the supported range.
pub fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        return MIN_TEMPERATURE;
    }
    temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
}

/// Sends prompts to a [`TextGenerator`] with bounded retry.
///
/// Rate limits, timeouts and transport failures are retried with
/// exponential backoff. Upstream errors surface immediately.
pub struct GenerationClient {
    inner: Arc<dyn TextGenerator>,
    model: String,
    config: RetryConfig,
    case_max_tokens: Option<u32>,
    script_max_tokens: Option<u32>,
}

impl GenerationClient {
    /// Create a new generation client.
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            inner: generator,
            model: model.into(),
            config: RetryConfig::default(),
            case_max_tokens: None,
            script_max_tokens: None,
        }
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the token budget for one stage.
    pub fn with_max_tokens(mut self, stage: PromptStage, max_tokens: u32) -> Self {
        match stage {
            PromptStage::TestCases => self.case_max_tokens = Some(max_tokens),
            PromptStage::Script => self.script_max_tokens = Some(max_tokens),
        }
        self
    }

    /// Send a prompt and return the raw reply.
    ///
    /// `on_retry` is called once per failed attempt that will be retried,
    /// before the backoff sleep.
    pub async fn invoke(
        &self,
        prompt: &Prompt,
        temperature: f32,
        on_retry: &(dyn Fn(&RetryNotice) + Send + Sync),
    ) -> Result<String, GenerationError> {
        let request = self.request_for(prompt, temperature);
        let max_attempts = self.config.max_attempts.max(1);
        debug!(
            generator = self.inner.id(),
            model = %request.model,
            stage = %prompt.stage,
            "Invoking generator"
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.attempt(request.clone()).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                return Err(error);
            }

            let delay = self.config.delay_after(attempt - 1, &error);
            warn!(
                "Generation error (attempt {}/{}): {}, retrying in {:?}",
                attempt, max_attempts, error, delay
            );
            on_retry(&RetryNotice {
                attempt,
                max_attempts,
                error,
                delay,
            });
            sleep(delay).await;
        }
    }

    async fn attempt(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        match timeout(self.config.attempt_timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.config.attempt_timeout.as_secs())),
        }
    }

    fn request_for(&self, prompt: &Prompt, temperature: f32) -> GenerationRequest {
        let mut request =
            GenerationRequest::new(&self.model, &prompt.user, clamp_temperature(temperature))
                .with_system(&prompt.system);
        let budget = match prompt.stage {
            PromptStage::TestCases => self.case_max_tokens,
            PromptStage::Script => self.script_max_tokens,
        };
        if let Some(max_tokens) = budget {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
