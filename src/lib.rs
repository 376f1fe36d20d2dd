//! # axon
//!
//! **axon** is the internal event backbone for a conversational agent:
//! a priority-ordered publish/subscribe bus with per-delivery retry, and a
//! three-tier memory system that consumes bus traffic and serves ranked,
//! activation-scored recall.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  Publishers (many):                         Subscribers (per topic):
//!    orchestrator ──┐
//!    triggers     ──┼─ publish(topic, payload, priority)
//!    tools        ──┘          │
//!                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Bus                                                              │
//! │  - DispatchQueue (priority desc, FIFO ties)                       │
//! │  - SubscriberRegistry (topic → callbacks, snapshot on dequeue)    │
//! │  - Dispatcher (single consumer loop)                              │
//! └──────┬────────────────────┬───────────────────────┬───────────────┘
//!        ▼                    ▼                       ▼
//!   deliver(sub1)        deliver(sub2)   ...     deliver(subN)
//!   (spawned, tracked, retry + backoff, panic-isolated)
//!        │                                               │
//!        ▼                                               ▼
//!   LogSubscriber                                  MemoryAdapter
//!                                                 ┌──────┼────────────┐
//!                                                 ▼      ▼            ▼
//!                                            Working   Cache     Long-term
//!                                            (graph)  (TTL map)  (SQLite)
//! ```
//!
//! ### Delivery lifecycle
//! ```text
//! publish ──► queue (never blocks)
//! dispatcher pops one envelope
//!   ├─► snapshot subscribers for its topic
//!   ├─► none registered → drop silently (startup races are expected)
//!   └─► one delivery task per subscriber:
//!         loop {
//!           attempt on_event()
//!             ├─ Ok            → done
//!             ├─ Err(Fatal)    → log, drop
//!             └─ Err(Retryable)
//!                  ├─ budget left → sleep min(2^n, 30)s, retry
//!                  └─ exhausted   → log terminal failure, drop
//!         }
//! ```
//!
//! ## Guarantees
//! | Property           | What holds                                              |
//! |--------------------|---------------------------------------------------------|
//! | Topic ordering     | priority descending, then FIFO, per topic               |
//! | Isolation          | one failing/panicking subscriber never affects others   |
//! | Delivery           | at-least-once per currently-registered subscriber       |
//! | Publish            | non-blocking; silent no-op after `stop()`               |
//! | Shutdown           | `shutdown()` drains the queue and awaits deliveries     |
//!
//! Not provided: exactly-once delivery, cross-process fan-out, durable
//! replay after a crash, embedding-based similarity.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use axon::{Bus, Config, MemoryAdapter, Priority, topics};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let bus = Bus::new(cfg.bus);
//!     let memory = Arc::new(MemoryAdapter::new(&cfg.memory)?);
//!
//!     // Memory rides the bus like any other subscriber.
//!     memory.attach(&bus).await?;
//!     bus.start();
//!
//!     bus.publish(
//!         topics::USER_INPUT,
//!         json!({"content": "hello world", "user_id": "u1"}),
//!         Priority::Normal,
//!     )?;
//!
//!     bus.shutdown().await;
//!
//!     let context = memory.get_context("hello").await;
//!     assert!(!context.is_empty());
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod memory;
mod policies;
mod subscribers;

pub mod topics;

// ---- Public re-exports ----

pub use crate::core::Bus;
pub use config::{BusConfig, Config, MemoryConfig};
pub use error::{BusError, MemoryError, SubscribeError};
pub use events::{DEFAULT_MAX_RETRIES, Envelope, Priority};
pub use memory::{
    ActivationScorer, ActivationWeights, CacheTier, Interaction, LongTermStore, MemoryAdapter,
    MemoryRecord, WorkingTier, similarity, tokenize,
};
pub use policies::{JitterPolicy, RetryPolicy};
pub use subscribers::{LogSubscriber, Subscribe, SubscriberFn, SubscriberRef, SubscriptionHandle};
