//! # Runtime configuration.
//!
//! [`Config`] bundles the bus and memory settings. Both halves are plain
//! structs with public fields and documented defaults; construct them
//! directly or start from `Default` and override.
//!
//! ## Sentinel values
//! - `MemoryConfig::db_path = None` → private in-memory long-term store
//! - `MemoryConfig::working_capacity` is clamped to a minimum of 1 by the
//!   working tier

use std::path::PathBuf;
use std::time::Duration;

use crate::error::MemoryError;
use crate::memory::ActivationWeights;
use crate::policies::RetryPolicy;

/// Top-level configuration for a bus + memory deployment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Bus settings.
    pub bus: BusConfig,
    /// Memory tier settings.
    pub memory: MemoryConfig,
}

/// Settings for the event bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusConfig {
    /// Retry policy applied to every delivery; `retry.max_retries` is also
    /// the default retry budget stamped onto published envelopes.
    pub retry: RetryPolicy,
}

/// Settings for the three memory tiers and the activation scorer.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Long-term SQLite database path; `None` keeps it in memory.
    pub db_path: Option<PathBuf>,
    /// Cache tier entry lifetime.
    pub cache_ttl: Duration,
    /// Long-term retention window used by the default retention sweep.
    pub retention_ttl: Duration,
    /// Maximum node count of the working-tier graph (oldest evicted first).
    pub working_capacity: usize,
    /// Minimum content similarity for a working-tier edge, in [0, 1].
    pub similarity_threshold: f64,
    /// Per-tier activation weights; must sum to 1.
    pub weights: ActivationWeights,
    /// Result count for [`MemoryAdapter::get_context`](crate::MemoryAdapter::get_context).
    pub context_limit: usize,
}

impl Default for MemoryConfig {
    /// Default configuration:
    ///
    /// - `db_path = None` (in-memory store)
    /// - `cache_ttl = 1h`
    /// - `retention_ttl = 7 days`
    /// - `working_capacity = 256`
    /// - `similarity_threshold = 0.3`
    /// - `weights = 0.4 / 0.3 / 0.3`
    /// - `context_limit = 5`
    fn default() -> Self {
        Self {
            db_path: None,
            cache_ttl: Duration::from_secs(3600),
            retention_ttl: Duration::from_secs(7 * 24 * 3600),
            working_capacity: 256,
            similarity_threshold: 0.3,
            weights: ActivationWeights::default(),
            context_limit: 5,
        }
    }
}

impl MemoryConfig {
    /// Checks internal consistency.
    ///
    /// # Errors
    /// [`MemoryError::InvalidConfig`] when the activation weights do not sum
    /// to 1, the similarity threshold leaves [0, 1], or the working capacity
    /// is zero.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if (self.weights.sum() - 1.0).abs() > 1e-6 {
            return Err(MemoryError::InvalidConfig {
                reason: format!("activation weights sum to {}, expected 1.0", self.weights.sum()),
            });
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(MemoryError::InvalidConfig {
                reason: format!(
                    "similarity threshold {} outside [0, 1]",
                    self.similarity_threshold
                ),
            });
        }
        if self.working_capacity == 0 {
            return Err(MemoryError::InvalidConfig {
                reason: "working capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
