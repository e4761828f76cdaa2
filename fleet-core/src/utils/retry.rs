use crate::config::RetrySettings;
use crate::error::CallError;
use crate::utils::proxy_manager::ProxyBinding;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Bounded retries with exponential backoff and proxy rotation.
///
/// Failures never escape: the caller gets `Some(value)` or `None`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
    pub backoff: f64,
    pub attempt_timeout: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, base_delay: Duration, backoff: f64) -> Self {
        Self {
            retries,
            base_delay,
            backoff,
            ..Default::default()
        }
    }

    /// Out-of-range delays collapse to `max_delay` instead of panicking.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        let max_delay = Duration::from_secs(settings.max_delay_secs);
        Self {
            retries: settings.retries,
            base_delay: Duration::try_from_secs_f64(settings.delay_secs.max(0.0))
                .unwrap_or(max_delay),
            backoff: settings.backoff,
            attempt_timeout: Duration::from_secs(settings.attempt_timeout_secs),
            max_delay,
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff.powi(attempt as i32);
        let delay = self.base_delay.as_secs_f64() * factor;
        if delay >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::try_from_secs_f64(delay).unwrap_or(self.max_delay)
    }

    /// Runs `operation` until it succeeds or `retries + 1` attempts failed.
    ///
    /// Each attempt is bounded by `attempt_timeout`. A transport failure
    /// rotates `proxy` (when given) before the backoff sleep.
    pub async fn run<T, F, Fut>(
        &self,
        operation_name: &str,
        proxy: Option<&ProxyBinding>,
        mut operation: F,
    ) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        for attempt in 0..=self.retries {
            let result = match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(CallError::transport(format!(
                    "attempt timed out after {:?}",
                    self.attempt_timeout
                ))),
            };

            let e = match result {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{} succeeded on attempt {}", operation_name, attempt + 1);
                    }
                    return Some(value);
                }
                Err(e) => e,
            };

            if attempt == self.retries {
                error!(
                    "{} failed after {} retries: {}",
                    operation_name, self.retries, e
                );
                return None;
            }

            if e.kind.is_transport() {
                if let Some(binding) = proxy {
                    warn!(
                        "[{}] Attempt {} failed ({}). Changing proxy...",
                        operation_name,
                        attempt + 1,
                        e
                    );
                    binding.rotate().await;
                }
            }

            let delay = self.delay_for(attempt);
            debug!(
                "{} failed (attempt {}/{}). Retrying in {:?}: {}",
                operation_name,
                attempt + 1,
                self.retries + 1,
                delay,
                e
            );
            tokio::time::sleep(delay).await;
        }

        None
    }
}
