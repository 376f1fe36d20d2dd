//! # Bus: the publish/subscribe facade.
//!
//! [`Bus`] owns the priority queue, the subscriber registry, and the
//! dispatcher task. Publishers and subscribers only ever talk to this type.
//!
//! ## Properties
//! - **Non-blocking publish**: `publish()` enqueues and returns; it never
//!   waits for delivery and never observes subscriber failures.
//! - **Fire-and-forget delivery**: per-subscriber retry happens in spawned
//!   delivery tasks; one failing subscriber cannot affect another.
//! - **Cooperative stop**: `stop()` flips a token — publishes become silent
//!   no-ops and the dispatcher exits; in-flight deliveries finish.
//! - **Draining shutdown**: `shutdown()` additionally delivers everything
//!   enqueued before the call, then waits for all deliveries to settle.
//!
//! ## Example
//! ```rust
//! use axon::{Bus, BusConfig, Envelope, Priority, SubscriberFn};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = Bus::new(BusConfig::default());
//!     bus.start();
//!
//!     let handle = bus
//!         .subscribe(
//!             "user_input",
//!             SubscriberFn::arc("echo", |envelope: Envelope| async move {
//!                 println!("got: {}", envelope.payload);
//!                 Ok::<_, axon::SubscribeError>(())
//!             }),
//!         )
//!         .await?;
//!
//!     bus.publish("user_input", json!({"content": "hello"}), Priority::Normal)?;
//!     bus.shutdown().await;
//!
//!     let _ = handle;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::BusConfig;
use crate::core::dispatcher::Dispatcher;
use crate::error::BusError;
use crate::events::{DispatchQueue, Envelope, Priority};
use crate::subscribers::{SubscriberRef, SubscriberRegistry, SubscriptionHandle};

/// Priority-ordered publish/subscribe bus with retrying delivery.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Bus {
    cfg: BusConfig,
    queue: Arc<DispatchQueue>,
    registry: Arc<SubscriberRegistry>,
    tracker: TaskTracker,
    /// Intake gate: once cancelled, `publish` is a silent no-op.
    stopped: CancellationToken,
    /// Loop gate: once cancelled, the dispatcher exits.
    halt: CancellationToken,
    drain_on_halt: Arc<AtomicBool>,
    started: AtomicBool,
}

impl Bus {
    /// Creates a bus. Call [`Bus::start`] to spawn the dispatcher loop.
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            cfg,
            queue: Arc::new(DispatchQueue::new()),
            registry: Arc::new(SubscriberRegistry::new()),
            tracker: TaskTracker::new(),
            stopped: CancellationToken::new(),
            halt: CancellationToken::new(),
            drain_on_halt: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
        }
    }

    /// Spawns the dispatcher loop onto the current tokio runtime.
    ///
    /// Idempotent; only the first call spawns. Envelopes published before
    /// `start()` stay queued and are dispatched once the loop runs.
    pub fn start(&self) {
        if self.started.swap(true, AtomicOrdering::SeqCst) {
            return;
        }
        let dispatcher = Dispatcher {
            queue: Arc::clone(&self.queue),
            registry: Arc::clone(&self.registry),
            retry: self.cfg.retry,
            tracker: self.tracker.clone(),
            halt: self.halt.clone(),
            drain_on_halt: Arc::clone(&self.drain_on_halt),
        };
        tokio::spawn(dispatcher.run());
    }

    /// Publishes a payload to a topic.
    ///
    /// Constructs an envelope with the given priority and the configured
    /// retry budget, then enqueues it. Never blocks, never reports
    /// subscriber failures. After [`Bus::stop`] this returns `Ok(())`
    /// without enqueuing.
    ///
    /// # Errors
    /// [`BusError::EmptyTopic`] — a topic must be a non-empty routing key.
    pub fn publish(
        &self,
        topic: &str,
        payload: Value,
        priority: Priority,
    ) -> Result<(), BusError> {
        let envelope = Envelope::new(topic, payload)
            .with_priority(priority)
            .with_max_retries(self.cfg.retry.max_retries);
        self.publish_envelope(envelope)
    }

    /// Publishes a pre-built envelope (provenance, custom retry budget).
    ///
    /// # Errors
    /// [`BusError::EmptyTopic`] — a topic must be a non-empty routing key.
    pub fn publish_envelope(&self, envelope: Envelope) -> Result<(), BusError> {
        if envelope.topic.is_empty() {
            return Err(BusError::EmptyTopic);
        }
        if self.stopped.is_cancelled() {
            tracing::debug!(
                topic = %envelope.topic,
                id = %envelope.id,
                "bus stopped; publish ignored"
            );
            return Ok(());
        }
        self.queue.push(envelope);
        Ok(())
    }

    /// Registers a subscriber for a topic.
    ///
    /// The registration is visible to the next dequeued envelope; dispatches
    /// already in flight keep their snapshot.
    ///
    /// # Errors
    /// [`BusError::EmptyTopic`] — reported at registration time, never at
    /// dispatch time.
    pub async fn subscribe(
        &self,
        topic: &str,
        subscriber: SubscriberRef,
    ) -> Result<SubscriptionHandle, BusError> {
        self.registry.subscribe(topic, subscriber).await
    }

    /// Removes a registration by handle.
    ///
    /// # Errors
    /// [`BusError::UnknownSubscription`] — the handle was never issued here
    /// or was already used.
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<(), BusError> {
        self.registry.unsubscribe(handle).await
    }

    /// Stops the bus cooperatively.
    ///
    /// New publishes return immediately without enqueuing (no error); the
    /// dispatcher exits after its current iteration; deliveries already
    /// dispatched continue to completion or retry exhaustion. Envelopes
    /// still queued are **not** delivered — use [`Bus::shutdown`] to drain.
    pub fn stop(&self) {
        self.stopped.cancel();
        self.halt.cancel();
    }

    /// Stops the bus and waits for it to settle.
    ///
    /// Everything enqueued before this call is delivered (or terminally
    /// dropped by the retry executor), then all delivery tasks are awaited.
    pub async fn shutdown(&self) {
        self.stopped.cancel();
        self.drain_on_halt.store(true, AtomicOrdering::Release);
        self.halt.cancel();
        if !self.started.load(AtomicOrdering::SeqCst) {
            // No dispatcher to close the tracker for us.
            self.tracker.close();
        }
        self.tracker.wait().await;
    }

    /// True once [`Bus::stop`] or [`Bus::shutdown`] was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Number of envelopes waiting in the dispatch queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Number of subscribers currently registered for a topic.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.registry.topic_len(topic).await
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}
