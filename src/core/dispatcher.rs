//! # Dispatcher: the single consumer loop draining the priority queue.
//!
//! One dispatcher runs per bus instance. Each iteration dequeues exactly one
//! envelope, snapshots the subscriber list for its topic, and spawns one
//! independent [`delivery`](super::delivery) per subscriber onto the bus's
//! task tracker.
//!
//! ## Architecture
//! ```text
//! DispatchQueue ──► Dispatcher::run()
//!                        │ pop (priority desc, FIFO ties)
//!                        ▼
//!                registry.snapshot(topic)
//!                        │
//!          ┌─────────────┼──────────────┐        no subscribers:
//!          ▼             ▼              ▼        drop silently (debug)
//!     deliver(s1)   deliver(s2)   deliver(sN)
//!     (tracked, concurrent, retry-isolated)
//! ```
//!
//! ## Rules
//! - Subscribers of one envelope start only after that envelope is dequeued;
//!   their **completion** order is unspecified.
//! - Within one topic, dispatch order is priority descending then FIFO;
//!   no ordering exists across topics.
//! - On halt: exit after the current iteration; when the drain flag is set
//!   (shutdown path), consume the remaining queue first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::delivery;
use crate::events::{DispatchQueue, Envelope};
use crate::policies::RetryPolicy;
use crate::subscribers::SubscriberRegistry;

/// The bus's consumer loop. Constructed by [`Bus::start`](crate::Bus::start).
pub(crate) struct Dispatcher {
    pub(crate) queue: Arc<DispatchQueue>,
    pub(crate) registry: Arc<SubscriberRegistry>,
    pub(crate) retry: RetryPolicy,
    pub(crate) tracker: TaskTracker,
    pub(crate) halt: CancellationToken,
    pub(crate) drain_on_halt: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Runs until halted; closes the delivery tracker on exit.
    pub(crate) async fn run(self) {
        loop {
            let envelope = tokio::select! {
                envelope = self.queue.pop() => envelope,
                _ = self.halt.cancelled() => break,
            };
            self.dispatch(envelope).await;
        }

        if self.drain_on_halt.load(AtomicOrdering::Acquire) {
            while let Some(envelope) = self.queue.try_pop() {
                self.dispatch(envelope).await;
            }
        }
        self.tracker.close();
    }

    /// Fans one envelope out to all subscribers registered at dequeue time.
    async fn dispatch(&self, envelope: Envelope) {
        let subscribers = self.registry.snapshot(&envelope.topic).await;
        if subscribers.is_empty() {
            // Publish-without-subscriber is expected (startup races).
            tracing::debug!(
                topic = %envelope.topic,
                id = %envelope.id,
                "no subscribers registered; envelope dropped"
            );
            return;
        }

        for subscriber in subscribers {
            self.tracker
                .spawn(delivery::deliver(subscriber, envelope.clone(), self.retry));
        }
    }
}
