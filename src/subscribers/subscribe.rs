//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging callbacks into the bus.
//! Each registered subscriber receives every envelope published to its topic,
//! delivered by a dedicated spawned task with retry/backoff around it.
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching) — they do **not** block the
//!   publisher nor other subscribers of the same envelope.
//! - The return value tells the retry executor what to do: `Ok(())` ends the
//!   delivery; a retryable error consumes one retry from the envelope's
//!   budget; a fatal error drops the delivery immediately.
//! - Side effects must tolerate at-least-once delivery: the bus does not
//!   deduplicate, and a retried callback observes the same envelope id.
//!
//! ## Example (skeleton)
//! ```rust
//! use axon::{Envelope, Subscribe, SubscribeError};
//! use async_trait::async_trait;
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Subscribe for Audit {
//!     async fn on_event(&self, envelope: &Envelope) -> Result<(), SubscribeError> {
//!         // write audit record...
//!         let _ = &envelope.payload;
//!         Ok(())
//!     }
//!     fn name(&self) -> &str { "audit" }
//! }
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SubscribeError;
use crate::events::Envelope;

/// Shared reference to a subscriber (`Arc<dyn Subscribe>`).
pub type SubscriberRef = Arc<dyn Subscribe>;

/// Contract for event subscribers.
///
/// Called from a delivery-dedicated spawned task. Implementations should
/// avoid blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single envelope for this subscriber.
    ///
    /// # Parameters
    /// - `envelope`: Reference to the envelope (does not transfer ownership)
    async fn on_event(&self, envelope: &Envelope) -> Result<(), SubscribeError>;

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Function-backed subscriber implementation.
///
/// Wraps a closure that *creates* a new future per delivery, so there is no
/// shared mutable state between invocations; share state explicitly with an
/// `Arc<...>` inside the closure if needed.
///
/// ## Example
/// ```rust
/// use axon::{Envelope, SubscribeError, SubscriberFn, SubscriberRef};
///
/// let s: SubscriberRef = SubscriberFn::arc("printer", |envelope: Envelope| async move {
///     println!("{}: {}", envelope.topic, envelope.payload);
///     Ok::<_, SubscribeError>(())
/// });
///
/// assert_eq!(s.name(), "printer");
/// ```
#[derive(Debug)]
pub struct SubscriberFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> SubscriberFn<F> {
    /// Creates a new function-backed subscriber.
    ///
    /// Prefer [`SubscriberFn::arc`] when you immediately need a [`SubscriberRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the subscriber and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Subscribe for SubscriberFn<F>
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), SubscribeError>> + Send + 'static,
{
    async fn on_event(&self, envelope: &Envelope) -> Result<(), SubscribeError> {
        (self.f)(envelope.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
