//! # Memory record: the unit stored across the three tiers.
//!
//! A [`MemoryRecord`] is created exactly once, when a completed interaction
//! reaches the memory adapter, and is never mutated afterwards — except for
//! the tier-local `relevance`, which each tier recomputes at query time and
//! which is never persisted as ground truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One stored memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Globally unique record id.
    pub id: Uuid,
    /// Record kind (e.g. `interaction`, `user_input`); maps to the
    /// long-term `type` column.
    pub kind: String,
    /// Text content the tiers index and match against.
    pub content: String,
    /// Creation timestamp, set once.
    pub timestamp: DateTime<Utc>,
    /// Tier-local score, recomputed at query time.
    pub relevance: f64,
    /// Opaque structured metadata; persisted as JSON text.
    pub metadata: Option<Value>,
}

impl MemoryRecord {
    /// Creates a record with a fresh id and the current timestamp.
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            content: content.into(),
            timestamp: Utc::now(),
            relevance: 0.0,
            metadata: None,
        }
    }

    /// Attaches structured metadata.
    #[inline]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Overrides the creation timestamp (used when rehydrating stored rows).
    #[inline]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns a copy with the tier-local relevance set.
    #[inline]
    pub fn scored(mut self, relevance: f64) -> Self {
        self.relevance = relevance;
        self
    }

    /// Age of this record relative to `now`, in seconds (never negative).
    pub fn age_seconds(&self, now: DateTime<Utc>) -> f64 {
        let millis = now.signed_duration_since(self.timestamp).num_milliseconds();
        (millis.max(0) as f64) / 1000.0
    }
}
