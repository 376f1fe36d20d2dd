//! # Deliver one envelope to one subscriber, with bounded retries.
//!
//! [`deliver`] is the retry executor: it owns the delivery of a single
//! envelope clone to a single subscriber and never reports back to the
//! dispatcher — a failing subscriber can never block or fail delivery to
//! the other subscribers of the same envelope.
//!
//! ## Flow
//! ```text
//! attempt ──► Ok            → done
//!         ──► Err(Fatal)    → log, drop (no retry)
//!         ──► Err(Retryable)
//!               ├─ budget left  → retry_count += 1,
//!               │                 sleep retry.delay(retry_count), retry
//!               └─ exhausted    → log terminal failure, drop
//! ```
//!
//! ## Rules
//! - A permanently failing subscriber is invoked exactly `max_retries + 1`
//!   times; `retry_count` reaches `max_retries` and stops.
//! - Panics are caught (`catch_unwind`) and treated as retryable failures;
//!   a panicking subscriber never takes down the dispatcher.
//! - Deliveries are not cancelled by `stop()`/`shutdown()`: once dispatched,
//!   a delivery runs to completion or retry exhaustion.

use std::any::Any;

use futures::FutureExt;
use tokio::time;

use crate::error::SubscribeError;
use crate::events::Envelope;
use crate::policies::RetryPolicy;
use crate::subscribers::{Subscribe, SubscriberRef};

/// Runs one (subscriber, envelope) delivery with retry and backoff.
///
/// The envelope is this delivery's private clone; its `retry_count` is
/// advanced here and nowhere else.
pub(crate) async fn deliver(subscriber: SubscriberRef, mut envelope: Envelope, retry: RetryPolicy) {
    loop {
        match attempt(subscriber.as_ref(), &envelope).await {
            Ok(()) => {
                tracing::trace!(
                    subscriber = subscriber.name(),
                    id = %envelope.id,
                    topic = %envelope.topic,
                    "delivered"
                );
                return;
            }
            Err(err) if !err.is_retryable() => {
                tracing::warn!(
                    subscriber = subscriber.name(),
                    id = %envelope.id,
                    topic = %envelope.topic,
                    error = %err,
                    "delivery dropped: fatal subscriber error"
                );
                return;
            }
            Err(err) => {
                if envelope.retries_exhausted() {
                    tracing::warn!(
                        subscriber = subscriber.name(),
                        id = %envelope.id,
                        topic = %envelope.topic,
                        retry_count = envelope.retry_count,
                        error = %err,
                        "delivery dropped: retry budget exhausted"
                    );
                    return;
                }
                envelope.retry_count += 1;
                let delay = retry.delay(envelope.retry_count);
                tracing::debug!(
                    subscriber = subscriber.name(),
                    id = %envelope.id,
                    retry = envelope.retry_count,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "delivery failed; retry scheduled"
                );
                time::sleep(delay).await;
            }
        }
    }
}

/// Executes a single attempt, converting panics into retryable errors.
async fn attempt(
    subscriber: &dyn Subscribe,
    envelope: &Envelope,
) -> Result<(), SubscribeError> {
    let fut = subscriber.on_event(envelope);
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(SubscribeError::Retryable {
            error: panic_message(&panic),
        }),
    }
}

/// Extracts a printable message from a caught panic payload.
fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    /// Fails the first `fail_first` attempts, then succeeds.
    struct Flaky {
        calls: AtomicU32,
        fail_first: u32,
        fatal: bool,
    }

    impl Flaky {
        fn arc(fail_first: u32, fatal: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail_first,
                fatal,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Subscribe for Flaky {
        async fn on_event(&self, _envelope: &Envelope) -> Result<(), SubscribeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                if self.fatal {
                    Err(SubscribeError::fatal("broken"))
                } else {
                    Err(SubscribeError::retryable("boom"))
                }
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn envelope() -> Envelope {
        Envelope::new("t", json!({"content": "x"}))
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_invoked_max_retries_plus_one() {
        let sub = Flaky::arc(u32::MAX, false);
        deliver(sub.clone(), envelope(), RetryPolicy::default()).await;
        assert_eq!(sub.calls(), 4); // max_retries = 3
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let sub = Flaky::arc(2, false);
        deliver(sub.clone(), envelope(), RetryPolicy::default()).await;
        assert_eq!(sub.calls(), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_skips_retries() {
        let sub = Flaky::arc(u32::MAX, true);
        deliver(sub.clone(), envelope(), RetryPolicy::default()).await;
        assert_eq!(sub.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_is_exponential() {
        let sub = Flaky::arc(u32::MAX, false);
        let start = tokio::time::Instant::now();
        deliver(sub, envelope(), RetryPolicy::default()).await;
        // 2s + 4s + 8s of backoff between the four attempts.
        assert_eq!(start.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_subscriber_is_retried_and_contained() {
        struct Bomb {
            calls: AtomicU32,
        }

        #[async_trait]
        impl Subscribe for Bomb {
            async fn on_event(&self, _envelope: &Envelope) -> Result<(), SubscribeError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                panic!("kaboom");
            }
            fn name(&self) -> &str {
                "bomb"
            }
        }

        let sub = Arc::new(Bomb {
            calls: AtomicU32::new(0),
        });
        deliver(sub.clone(), envelope(), RetryPolicy::default()).await;
        assert_eq!(sub.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_budget_means_single_attempt() {
        let sub = Flaky::arc(u32::MAX, false);
        let env = envelope().with_max_retries(0);
        deliver(sub.clone(), env, RetryPolicy::default()).await;
        assert_eq!(sub.calls(), 1);
    }
}
