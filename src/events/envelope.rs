//! # Event envelope: the unit of transit on the bus.
//!
//! An [`Envelope`] carries a topic (routing key), an opaque JSON payload,
//! an ordinal [`Priority`], provenance, and the retry counters owned by the
//! delivery of this envelope to a single subscriber.
//!
//! ## Rules
//! - The envelope is immutable after construction, except for `retry_count`,
//!   which is advanced by the retry executor on its private clone.
//! - The bus never inspects the payload; the payload contract is per-topic,
//!   between publisher and subscribers.
//! - `retry_count <= max_retries` always holds; a delivery that exhausts the
//!   budget is dropped for that subscriber only.
//!
//! ## Example
//! ```rust
//! use axon::{Envelope, Priority};
//! use serde_json::json;
//!
//! let env = Envelope::new("user_input", json!({"content": "hello"}))
//!     .with_priority(Priority::High)
//!     .with_source("web");
//!
//! assert_eq!(env.topic, "user_input");
//! assert_eq!(env.priority, Priority::High);
//! assert_eq!(env.retry_count, 0);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Default retry budget for a single (subscriber, envelope) delivery.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ordinal message priority.
///
/// Higher priorities are dispatched first; ties are broken by enqueue
/// order (FIFO), never by topic or payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background traffic; dispatched after everything else.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Dispatched before normal traffic.
    High,
    /// Dispatched before everything else.
    Urgent,
}

impl Priority {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

/// The unit of transit on the bus.
///
/// - `id`: globally unique, assigned at construction.
/// - `topic`: routing key selecting the subscriber set.
/// - `payload`: opaque structured value; validated by subscribers, not the bus.
/// - `retry_count` / `max_retries`: owned by the retry executor during the
///   delivery of this envelope to one subscriber; never shared across
///   subscribers (each delivery works on its own clone).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Globally unique envelope id.
    pub id: Uuid,
    /// Routing key; required, non-empty (enforced at publish time).
    pub topic: String,
    /// Opaque structured payload.
    pub payload: Value,
    /// Dispatch priority.
    pub priority: Priority,
    /// Identifier of the producing component (provenance, not routing).
    pub source: Option<String>,
    /// Construction timestamp, set once.
    pub created_at: DateTime<Utc>,
    /// Retries performed so far for the current delivery.
    pub retry_count: u32,
    /// Retry budget for a single delivery.
    pub max_retries: u32,
}

impl Envelope {
    /// Creates a new envelope with `Normal` priority and the default retry budget.
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            payload,
            priority: Priority::default(),
            source: None,
            created_at: Utc::now(),
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets the dispatch priority.
    #[inline]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attaches the producing component's identifier.
    #[inline]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Overrides the per-delivery retry budget.
    #[inline]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// True once the retry budget for the current delivery is exhausted.
    #[inline]
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}
