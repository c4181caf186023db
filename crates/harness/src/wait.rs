//! Bounded polling - the single synchronization primitive for page operations
//!
//! Pages render asynchronously; unguarded element access is the dominant
//! source of flakiness. Every operation that touches the browser goes
//! through [`WaitPolicy::until`] instead of assuming immediate presence.
//! No fixed sleeps, no busy-waiting without a ceiling.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::error::{HarnessError, HarnessResult};

/// Default budget for a single wait operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the condition is re-checked.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, DEFAULT_POLL_INTERVAL)
    }

    /// Poll `probe` until it yields a value or the budget elapses.
    ///
    /// `Ok(Some(v))` resolves the wait, `Ok(None)` re-polls after
    /// `poll_interval`, and `Err` propagates immediately - a failing driver
    /// is not a condition that will become true later.
    ///
    /// On deadline the error is [`HarnessError::Timeout`] carrying
    /// `description`. The condition is always checked one final time at the
    /// deadline, so a condition that becomes true at t < timeout resolves
    /// before the deadline and a never-true condition fails at it.
    pub async fn until<F, Fut, T>(&self, description: &str, probe: F) -> HarnessResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = HarnessResult<Option<T>>>,
    {
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(value) = probe().await? {
                return Ok(value);
            }

            if Instant::now() >= deadline {
                return Err(HarnessError::Timeout {
                    condition: description.to_string(),
                    timeout: self.timeout,
                });
            }

            // Never sleep past the deadline; the last check happens at it.
            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(self.poll_interval.min(remaining)).await;
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn resolves_when_condition_becomes_true() {
        let policy = WaitPolicy::new(Duration::from_secs(10), Duration::from_millis(100));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        // True on the fourth poll, i.e. at t = 300ms.
        let value = policy
            .until("counter to reach 4", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n >= 4 { Some(n) } else { None })
            })
            .await
            .unwrap();

        assert_eq!(value, 4);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn fails_at_the_deadline_not_before_not_after() {
        let policy = WaitPolicy::new(Duration::from_secs(2), Duration::from_millis(100));
        let start = Instant::now();

        let err = policy
            .until("a condition that never holds", || async {
                Ok(None::<()>)
            })
            .await
            .unwrap_err();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(2) + Duration::from_millis(200));
        match err {
            HarnessError::Timeout { condition, timeout } => {
                assert_eq!(condition, "a condition that never holds");
                assert_eq!(timeout, Duration::from_secs(2));
            }
            other => panic!("expected Timeout, got {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_propagate_immediately() {
        let policy = WaitPolicy::default();
        let start = Instant::now();

        let err = policy
            .until("anything", || async {
                Err::<Option<()>, _>(HarnessError::Driver("pipe closed".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, HarnessError::Driver(_)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
