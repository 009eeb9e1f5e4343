//! Bounded retry with exponential backoff.
//!
//! [`RetryPolicy`] is a plain value: it owns the attempt budget and the delay schedule and
//! takes the operation to run as a parameter, so it can be exercised with a fake operation
//! that fails a fixed number of times.
//!
//! The schedule follows `base_delay * 2^(attempt - 1)`, clamped to `[min_delay, max_delay]`.
//! With the defaults (1 s base, 4 s floor, 10 s ceiling) a call that keeps failing waits 4 s
//! after the first attempt and 4 s after the second, then gives up after the third.
//!
//! ```rust
//! use std::time::Duration;
//! use wordbench::retry::RetryPolicy;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.max_attempts, 3);
//! assert_eq!(policy.delay_after(1), Duration::from_secs(4));
//! assert_eq!(policy.delay_after(4), Duration::from_secs(8));
//! assert_eq!(policy.delay_after(5), Duration::from_secs(10));
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay unit that doubles after every failed attempt.
    pub base_delay: Duration,
    /// Lower clamp applied to every computed delay.
    pub min_delay: Duration,
    /// Upper clamp applied to every computed delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, min_delay: Duration, max_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay,
            min_delay,
            max_delay,
        }
    }

    /// A policy that retries `max_attempts` times without ever sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    ///
    /// This is the single place the schedule is computed; jitter would be added here.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let raw = self.base_delay.saturating_mul(1u32 << exponent);
        let ceiling = self.max_delay.max(self.min_delay);
        raw.max(self.min_delay).min(ceiling)
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// `operation` receives the 1-based attempt number. Failures before the last attempt are
    /// logged and swallowed; the last failure is returned unmodified.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts => {
                    let delay = self.delay_after(attempt);
                    log::warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => {
                    log::error!("Attempt {}/{} failed: {}. Giving up", attempt, attempts, err);
                    return Err(err);
                }
            }
        }
    }
}
