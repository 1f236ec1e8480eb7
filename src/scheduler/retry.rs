use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::error::{default_is_retriable, GraphError};

/// Exponential backoff with jitter, a cap, a bounded number of attempts, and
/// a predicate deciding which errors are worth retrying at all.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
    pub jitter: f64,
    pub retry_on: Arc<dyn Fn(&GraphError) -> bool + Send + Sync>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_backoff", &self.max_backoff)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(10),
            jitter: 0.2,
            retry_on: Arc::new(default_is_retriable),
        }
    }
}

impl RetryPolicy {
    /// No retries at all: a single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn retries_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    pub fn should_retry(&self, attempt: u32, err: &GraphError) -> bool {
        !self.retries_exhausted(attempt) && (self.retry_on)(err)
    }

    /// Backoff duration before attempt `attempt` (1-indexed: the delay
    /// before the *next* attempt after `attempt` has failed).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped = base.min(self.max_backoff.as_secs_f64());
        let jitter_span = capped * self.jitter;
        let jittered = if jitter_span > 0.0 {
            let offset = rand::rng().random_range(-jitter_span..=jitter_span);
            (capped + offset).max(0.0)
        } else {
            capped
        };
        Duration::from_secs_f64(jittered)
    }
}
