//! # Retry policy for failing deliveries.
//!
//! [`RetryPolicy`] controls how many times a delivery is retried and how the
//! delay grows between attempts. It is parameterized by:
//! - [`RetryPolicy::max_retries`] the per-delivery retry budget;
//! - [`RetryPolicy::base`] the initial delay;
//! - [`RetryPolicy::factor`] the multiplicative growth factor;
//! - [`RetryPolicy::cap`] the maximum delay.
//!
//! The delay for retry `n` (1-based) is `base × factor^n`, clamped to `cap`,
//! then jitter is applied. Because the base delay is derived purely from the
//! retry number, jitter output never feeds back into subsequent calculations.
//!
//! The defaults (`base = 1s`, `factor = 2.0`, `cap = 30s`, no jitter) give
//! the classic `min(2^n, 30)` seconds schedule.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use axon::RetryPolicy;
//!
//! let retry = RetryPolicy::default();
//!
//! // First retry sleeps 2s, second 4s, and so on, capped at 30s.
//! assert_eq!(retry.delay(1), Duration::from_secs(2));
//! assert_eq!(retry.delay(2), Duration::from_secs(4));
//! assert_eq!(retry.delay(10), Duration::from_secs(30));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delivery retry policy.
///
/// Shared by every delivery the dispatcher spawns; the mutable retry state
/// lives on the envelope clone owned by that delivery, not here.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Retry budget per (subscriber, envelope) delivery; a permanently
    /// failing subscriber is invoked `max_retries + 1` times in total.
    pub max_retries: u32,
    /// Delay unit; retry `n` waits `base × factor^n` before running.
    pub base: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Maximum delay cap.
    pub cap: Duration,
    /// Jitter policy to prevent thundering herd.
    pub jitter: JitterPolicy,
}

impl Default for RetryPolicy {
    /// Returns a policy with:
    /// - `max_retries = 3`;
    /// - `base = 1s`, `factor = 2.0` (exponential);
    /// - `cap = 30s`;
    /// - no jitter.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: Duration::from_secs(1),
            factor: 2.0,
            cap: Duration::from_secs(30),
            jitter: JitterPolicy::None,
        }
    }
}

impl RetryPolicy {
    /// Computes the backoff delay for the given retry number (1-based).
    ///
    /// The base delay is `base × factor^retry`, clamped to [`RetryPolicy::cap`].
    /// Jitter is applied to the clamped base; the result is **never** fed back
    /// into subsequent calculations.
    ///
    /// # Notes
    /// - Overflowing or non-finite intermediate values clamp to `cap`.
    /// - `factor = 1.0` keeps the delay constant at `base` (up to `cap`).
    pub fn delay(&self, retry: u32) -> Duration {
        let cap_secs = self.cap.as_secs_f64();
        let clamped_exp = retry.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.base.as_secs_f64() * self.factor.powi(clamped_exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > cap_secs {
                self.cap
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        self.jitter.apply(base)
    }
}
