//! # Activation scoring: blended recency/relevance estimate.
//!
//! `activation(record) = w_context × context + w_cache × cache + w_longterm × longterm`,
//! each sub-score in [0, 1]:
//!
//! - **context**: 0.5 if the record has non-empty content, else 0 — a
//!   placeholder signal; any content-aware heuristic in [0, 1] may replace it.
//! - **cache**: linear time decay, `max(0, 1 − age / 24h)`.
//! - **longterm**: step function, 0.9 under 24h, 0.3 after.
//!
//! The weights and the step curve are reference defaults, not tuned values;
//! the weights are configuration, validated to sum to 1.

use chrono::{DateTime, Utc};

use crate::memory::record::MemoryRecord;

/// One day in seconds; the knee of both time-based sub-scores.
const DAY_SECONDS: f64 = 86_400.0;

/// Context sub-score granted for non-empty content.
const CONTENT_SIGNAL: f64 = 0.5;

/// Long-term sub-score for records younger than a day.
const LONGTERM_FRESH: f64 = 0.9;

/// Long-term sub-score for records a day old or older.
const LONGTERM_STALE: f64 = 0.3;

/// Per-tier weights blended into the activation score.
#[derive(Debug, Clone, Copy)]
pub struct ActivationWeights {
    /// Weight of the working/context tier signal.
    pub context: f64,
    /// Weight of the cache tier signal.
    pub cache: f64,
    /// Weight of the long-term tier signal.
    pub longterm: f64,
}

impl Default for ActivationWeights {
    /// Reference weighting: 0.4 / 0.3 / 0.3.
    fn default() -> Self {
        Self {
            context: 0.4,
            cache: 0.3,
            longterm: 0.3,
        }
    }
}

impl ActivationWeights {
    /// Sum of the three weights; must be 1.0 for activation to stay in [0, 1].
    pub fn sum(&self) -> f64 {
        self.context + self.cache + self.longterm
    }
}

/// Computes blended activation scores for memory records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivationScorer {
    weights: ActivationWeights,
}

impl ActivationScorer {
    /// Creates a scorer with the given weights.
    pub fn new(weights: ActivationWeights) -> Self {
        Self { weights }
    }

    /// Blended activation of `record` as of `now`, clamped to [0, 1].
    pub fn activation(&self, record: &MemoryRecord, now: DateTime<Utc>) -> f64 {
        let age = record.age_seconds(now);
        let blended = self.weights.context * context_score(record)
            + self.weights.cache * cache_score(age)
            + self.weights.longterm * longterm_score(age);
        blended.clamp(0.0, 1.0)
    }
}

/// Content-presence signal: 0.5 for non-empty content, 0 otherwise.
fn context_score(record: &MemoryRecord) -> f64 {
    if record.content.trim().is_empty() {
        0.0
    } else {
        CONTENT_SIGNAL
    }
}

/// Linear decay to 0 over 24 hours.
pub(crate) fn cache_score(age_seconds: f64) -> f64 {
    (1.0 - age_seconds / DAY_SECONDS).clamp(0.0, 1.0)
}

/// Step decay: fresh under 24 hours, stale afterwards.
pub(crate) fn longterm_score(age_seconds: f64) -> f64 {
    if age_seconds < DAY_SECONDS {
        LONGTERM_FRESH
    } else {
        LONGTERM_STALE
    }
}
