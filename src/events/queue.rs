//! # Priority dispatch queue.
//!
//! [`DispatchQueue`] decouples publishers from delivery: `push` never blocks
//! and `pop` suspends until an envelope is available. Ordering is priority
//! descending, then FIFO within the same priority.
//!
//! ## Ordering
//! Each envelope is enqueued with a monotonic sequence number. The heap key
//! is `(priority, Reverse(seq))`, so the maximum element is the oldest
//! envelope of the highest priority — strict, deterministic ordering with
//! ties broken by arrival order, never by topic or payload.
//!
//! ## Rules
//! - **Unbounded**: `push` always succeeds and never suspends. Bounding the
//!   queue (and blocking `publish`) is a possible hardening, not done here.
//! - **Cancel-safe pop**: dropping a `pop` future loses nothing; envelopes
//!   stay in the heap until actually taken.
//! - **Single consumer**: the dispatcher is the only `pop` caller; `push`
//!   may be called from any number of tasks.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use tokio::sync::Notify;

use super::envelope::{Envelope, Priority};

/// Heap entry: priority first, then earliest sequence wins.
struct Queued {
    priority: Priority,
    seq: u64,
    envelope: Envelope,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.priority, Reverse(self.seq)).cmp(&(other.priority, Reverse(other.seq)))
    }
}

/// Concurrency-safe priority queue feeding the dispatcher.
pub(crate) struct DispatchQueue {
    heap: Mutex<BinaryHeap<Queued>>,
    notify: Notify,
    seq: AtomicU64,
}

impl DispatchQueue {
    /// Creates an empty queue.
    pub(crate) fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            seq: AtomicU64::new(0),
        }
    }

    /// Enqueues an envelope. Never blocks.
    pub(crate) fn push(&self, envelope: Envelope) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        let entry = Queued {
            priority: envelope.priority,
            seq,
            envelope,
        };
        // Poisoning only happens if a pushing/popping thread panicked inside
        // the lock; the heap itself is still structurally valid then.
        match self.heap.lock() {
            Ok(mut heap) => heap.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
        self.notify.notify_one();
    }

    /// Takes the highest-priority envelope if one is queued.
    pub(crate) fn try_pop(&self) -> Option<Envelope> {
        let mut heap = match self.heap.lock() {
            Ok(heap) => heap,
            Err(poisoned) => poisoned.into_inner(),
        };
        heap.pop().map(|q| q.envelope)
    }

    /// Waits until an envelope is available and takes it.
    pub(crate) async fn pop(&self) -> Envelope {
        loop {
            if let Some(envelope) = self.try_pop() {
                return envelope;
            }
            self.notify.notified().await;
        }
    }

    /// Number of queued envelopes.
    pub(crate) fn len(&self) -> usize {
        match self.heap.lock() {
            Ok(heap) => heap.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(topic: &str, priority: Priority, marker: u64) -> Envelope {
        Envelope::new(topic, json!({ "marker": marker })).with_priority(priority)
    }

    fn marker(envelope: &Envelope) -> u64 {
        envelope.payload["marker"].as_u64().expect("marker")
    }

    #[test]
    fn test_priority_descending() {
        let queue = DispatchQueue::new();
        queue.push(env("t", Priority::Low, 0));
        queue.push(env("t", Priority::Urgent, 1));
        queue.push(env("t", Priority::Normal, 2));
        queue.push(env("t", Priority::High, 3));

        let order: Vec<u64> = std::iter::from_fn(|| queue.try_pop())
            .map(|e| marker(&e))
            .collect();
        assert_eq!(order, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_fifo_within_priority() {
        let queue = DispatchQueue::new();
        for i in 0..5 {
            queue.push(env("t", Priority::Normal, i));
        }
        let order: Vec<u64> = std::iter::from_fn(|| queue.try_pop())
            .map(|e| marker(&e))
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_fifo_not_broken_by_topic() {
        let queue = DispatchQueue::new();
        queue.push(env("zzz", Priority::Normal, 0));
        queue.push(env("aaa", Priority::Normal, 1));
        let first = queue.try_pop().expect("first");
        assert_eq!(first.topic, "zzz");
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        use std::sync::Arc;

        let queue = Arc::new(DispatchQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::task::yield_now().await;
        queue.push(env("t", Priority::Normal, 7));

        let envelope = consumer.await.expect("join");
        assert_eq!(marker(&envelope), 7);
        assert_eq!(queue.len(), 0);
    }
}
