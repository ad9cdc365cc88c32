use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Exponential backoff parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1_000),
            multiplier: 2.0,
            max_delay: Duration::from_millis(30_000),
            max_retries: 5,
        }
    }
}

impl RetryPolicy {
    /// `min(initial * multiplier^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped = scaled.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Owns the reconnect attempt counter and the pending backoff timer.
///
/// One fire-once tokio task per scheduled retry; `cancel` aborts it so a
/// stale callback can never fire after cancellation. Callback panics are
/// caught and logged — a broken reconnect hook must not take down the host.
///
/// The backoff timer needs an ambient tokio runtime. On a plain host thread
/// [`RetryManager::schedule_retry`] refuses to arm (returns `None`) instead
/// of panicking.
pub struct RetryManager {
    policy: RetryPolicy,
    attempts: u32,
    pending: Option<tokio::task::JoinHandle<()>>,
}

impl RetryManager {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            pending: None,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.policy.max_retries
    }

    /// Arm the backoff timer for the next attempt. Returns the armed delay,
    /// or `None` when retries are exhausted or no tokio runtime is available
    /// to run the timer on.
    pub fn schedule_retry<F>(&mut self, callback: F) -> Option<Duration>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.can_retry() {
            tracing::warn!(attempts = self.attempts, "retry_budget_exhausted");
            return None;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::error!("retry_requires_tokio_runtime");
            return None;
        };

        self.cancel();
        let delay = self.policy.delay_for(self.attempts);
        self.attempts += 1;

        let attempt = self.attempts;
        // Fix the deadline now so the timer is armed at schedule time, not at
        // the spawned task's first poll (observable under a paused test clock).
        let sleep = tokio::time::sleep(delay);
        self.pending = Some(handle.spawn(async move {
            sleep.await;
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "retry_fired");
            if std::panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                tracing::error!(attempt, "retry_callback_panicked");
            }
        }));

        Some(delay)
    }

    /// Clear the attempt counter after a successful (re)connect. Also drops
    /// any armed timer.
    pub fn reset(&mut self) {
        self.cancel();
        self.attempts = 0;
    }

    /// Abort the pending timer, if any. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for RetryManager {
    fn drop(&mut self) {
        self.cancel();
    }
}
