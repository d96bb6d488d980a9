//! Transport-level retry with exponential backoff and jitter.
//!
//! Only transient failures (429/5xx or network errors) are retried here.
//! Invalid model output is the gateway's concern, not this layer's.

use gleaner_core::config::GatewaySettings;
use gleaner_core::llm::ModelError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&GatewaySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        Self {
            max_retries: settings.transport_retries,
            base_delay: Duration::from_millis(settings.backoff_base_ms),
            max_delay: Duration::from_millis(settings.backoff_max_ms),
        }
    }

    /// Delay before retry number `retry` (0-based).
    ///
    /// A provider hint wins over the computed backoff, capped at `max_delay`.
    pub fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max_delay);
        }
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay);
        let half = exp.as_millis() as u64 / 2;
        if half == 0 {
            return exp;
        }
        let jitter = rand::thread_rng().gen_range(0..=half);
        Duration::from_millis(half + jitter)
    }

    /// Runs `op`, retrying transient failures.
    ///
    /// Non-transient failures return immediately. When the retry budget runs
    /// out the last failure is returned marked recoverable, so the caller can
    /// retry the whole turn.
    pub async fn run<T, F, Fut>(&self, agent: &str, mut op: F) -> Result<T, ModelError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(mut err) => {
                    if retry >= self.max_retries {
                        err.recoverable = true;
                        return Err(err);
                    }
                    let delay = self.delay_for(retry, err.retry_after);
                    warn!(
                        agent,
                        retry = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        status = ?err.status_code,
                        "transient model failure, backing off: {}",
                        err.message
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
            }
        }
    }
}
