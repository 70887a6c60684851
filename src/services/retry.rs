use backoff::{backoff::Backoff, ExponentialBackoff};
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that know whether repeating the call could succeed
pub trait Retryable: std::error::Error {
    fn is_retryable(&self) -> bool;

    /// Server-suggested delay before the next attempt, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    #[error("Maximum retry attempts ({attempts}) exceeded: {last}")]
    MaxAttemptsExceeded { attempts: usize, last: E },

    #[error("Retry time budget exceeded: {last}")]
    TimeoutExceeded { last: E },

    #[error("Non-retryable error: {source}")]
    NonRetryable {
        #[source]
        source: E,
    },
}

impl<E: std::error::Error + 'static> RetryError<E> {
    /// Unwrap the error of the final attempt
    pub fn into_inner(self) -> E {
        match self {
            RetryError::MaxAttemptsExceeded { last, .. } => last,
            RetryError::TimeoutExceeded { last } => last,
            RetryError::NonRetryable { source } => source,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 disables retrying
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: bool,
    pub total_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
            total_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = timeout;
        self
    }

    /// Size the total budget so every allowed attempt may run for `timeout`
    /// with the longest backoff between attempts
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        let retries = u32::try_from(self.max_retries).unwrap_or(u32::MAX);
        self.total_timeout = timeout
            .saturating_mul(retries.saturating_add(1))
            .saturating_add(self.max_delay.saturating_mul(retries));
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// No waiting between attempts, for tests
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
            total_timeout: Duration::from_secs(60),
        }
    }
}

pub struct RetryHandler {
    config: RetryConfig,
    backoff: ExponentialBackoff,
    start_time: Instant,
    attempts: usize,
}

impl RetryHandler {
    pub fn new(config: RetryConfig) -> Self {
        let mut backoff = ExponentialBackoff {
            initial_interval: config.initial_delay,
            max_interval: config.max_delay,
            multiplier: config.multiplier,
            max_elapsed_time: Some(config.total_timeout),
            ..Default::default()
        };

        if !config.jitter {
            backoff.randomization_factor = 0.0;
        }

        Self {
            config,
            backoff,
            start_time: Instant::now(),
            attempts: 0,
        }
    }

    pub async fn retry<F, Fut, T, E>(&mut self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + 'static,
    {
        let max_attempts = self.config.max_retries + 1;

        loop {
            self.attempts += 1;

            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(RetryError::NonRetryable { source: error });
            }

            if self.attempts >= max_attempts {
                return Err(RetryError::MaxAttemptsExceeded {
                    attempts: self.attempts,
                    last: error,
                });
            }

            if self.start_time.elapsed() > self.config.total_timeout {
                return Err(RetryError::TimeoutExceeded { last: error });
            }

            let delay = error
                .retry_after()
                .or_else(|| self.backoff.next_backoff())
                .unwrap_or(self.config.max_delay);

            tracing::warn!(
                attempt = self.attempts,
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "Retryable error, backing off"
            );

            tokio::time::sleep(delay).await;
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Run `operation`, retrying transient failures according to `config`
pub async fn with_retry<F, Fut, T, E>(config: RetryConfig, operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + 'static,
{
    let mut handler = RetryHandler::new(config);
    handler.retry(operation).await
}
