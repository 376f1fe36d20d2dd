//! # Subscriber registry: per-topic registration lists.
//!
//! The registry maps topic names to ordered lists of subscriber handles.
//! Registration returns a [`SubscriptionHandle`] used for removal; there is
//! no ordering guarantee among callbacks of the same topic.
//!
//! ## Snapshot semantics
//! Dispatch iterates over a snapshot of the subscriber list cloned at
//! dequeue time, so concurrent subscribe/unsubscribe never corrupts an
//! in-progress dispatch — but may miss or include a subscriber racing the
//! snapshot. This is at-least-once-for-currently-registered delivery, not
//! linearizable.
//!
//! ## Rules
//! - Registering on an empty topic is a configuration error, reported at
//!   registration time (never at dispatch time).
//! - Unsubscribing an unknown or already-removed handle is an error too;
//!   handles are single-use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use tokio::sync::RwLock;

use crate::error::BusError;
use crate::subscribers::subscribe::SubscriberRef;

/// Proof of registration; pass back to `unsubscribe` to remove the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    topic: String,
    id: u64,
}

impl SubscriptionHandle {
    /// Topic this subscription was registered for.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Registration id, unique per registry.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// One registered callback.
struct Registration {
    id: u64,
    subscriber: SubscriberRef,
}

/// Thread-safe per-topic subscriber lists.
pub(crate) struct SubscriberRegistry {
    topics: RwLock<HashMap<String, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    pub(crate) fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers a subscriber for a topic.
    ///
    /// The registration is visible to the next dispatch snapshot; an
    /// in-flight dispatch keeps iterating over the snapshot it already took.
    pub(crate) async fn subscribe(
        &self,
        topic: &str,
        subscriber: SubscriberRef,
    ) -> Result<SubscriptionHandle, BusError> {
        if topic.is_empty() {
            return Err(BusError::EmptyTopic);
        }

        let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_string())
            .or_default()
            .push(Registration { id, subscriber });

        Ok(SubscriptionHandle {
            topic: topic.to_string(),
            id,
        })
    }

    /// Removes a registration by handle.
    pub(crate) async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<(), BusError> {
        let mut topics = self.topics.write().await;
        let unknown = || BusError::UnknownSubscription {
            topic: handle.topic.clone(),
            id: handle.id,
        };

        let list = topics.get_mut(&handle.topic).ok_or_else(unknown)?;
        let before = list.len();
        list.retain(|r| r.id != handle.id);
        if list.len() == before {
            return Err(unknown());
        }
        if list.is_empty() {
            topics.remove(&handle.topic);
        }
        Ok(())
    }

    /// Clones the current subscriber list for a topic.
    ///
    /// Called once per dequeued envelope; the returned vector is the
    /// dispatch snapshot.
    pub(crate) async fn snapshot(&self, topic: &str) -> Vec<SubscriberRef> {
        let topics = self.topics.read().await;
        topics
            .get(topic)
            .map(|list| {
                list.iter()
                    .map(|r| SubscriberRef::clone(&r.subscriber))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of registrations for a topic.
    pub(crate) async fn topic_len(&self, topic: &str) -> usize {
        let topics = self.topics.read().await;
        topics.get(topic).map(Vec::len).unwrap_or(0)
    }
}
