//! Error types used by the bus and the memory system.
//!
//! This module defines three error enums:
//!
//! - [`BusError`] — configuration errors raised at registration/publish time.
//! - [`SubscribeError`] — errors returned by subscriber callbacks during delivery.
//! - [`MemoryError`] — errors raised by the memory tiers.
//!
//! The types provide helper methods (`as_label`) for logging/metrics and
//! additional utilities such as [`SubscribeError::is_retryable`].

use thiserror::Error;

/// # Configuration errors raised by the bus.
///
/// These surface immediately at the call site (registration or publish),
/// never during dispatch. Transient delivery failures are handled by the
/// retry executor and are not represented here.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// A topic must be a non-empty routing key.
    #[error("topic must not be empty")]
    EmptyTopic,

    /// The subscription handle does not match any live registration.
    #[error("no subscription {id} registered for topic {topic:?}")]
    UnknownSubscription {
        /// Topic the handle was issued for.
        topic: String,
        /// Registration id carried by the handle.
        id: u64,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use axon::BusError;
    ///
    /// assert_eq!(BusError::EmptyTopic.as_label(), "bus_empty_topic");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::EmptyTopic => "bus_empty_topic",
            BusError::UnknownSubscription { .. } => "bus_unknown_subscription",
        }
    }
}

/// # Errors produced by subscriber callbacks.
///
/// A subscriber returns one of these from
/// [`Subscribe::on_event`](crate::Subscribe::on_event) to tell the retry
/// executor how to proceed. `Retryable` failures are retried with backoff
/// up to the envelope's retry budget; `Fatal` failures are logged and
/// dropped immediately.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SubscribeError {
    /// Delivery failed but may succeed if retried.
    #[error("delivery failed: {error}")]
    Retryable {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable delivery error (no retry).
    #[error("fatal delivery error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl SubscribeError {
    /// Convenience constructor for a retryable failure.
    pub fn retryable(error: impl Into<String>) -> Self {
        SubscribeError::Retryable {
            error: error.into(),
        }
    }

    /// Convenience constructor for a fatal failure.
    pub fn fatal(error: impl Into<String>) -> Self {
        SubscribeError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubscribeError::Retryable { .. } => "delivery_failed",
            SubscribeError::Fatal { .. } => "delivery_fatal",
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// # Example
    /// ```
    /// use axon::SubscribeError;
    ///
    /// assert!(SubscribeError::retryable("boom").is_retryable());
    /// assert!(!SubscribeError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubscribeError::Retryable { .. })
    }
}

/// # Errors produced by the memory tiers.
///
/// Long-term store failures at construction time propagate to the caller
/// (writes would otherwise be silently lost). At runtime a failing tier
/// degrades: the adapter logs it and continues with the remaining tiers.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Underlying SQLite failure in the long-term tier.
    #[error("long-term store error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Metadata/context column could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected configuration (weights, capacities, thresholds).
    #[error("invalid memory configuration: {reason}")]
    InvalidConfig {
        /// What was rejected and why.
        reason: String,
    },

    /// The long-term connection lock was poisoned by a panicking holder.
    #[error("long-term store lock poisoned")]
    LockPoisoned,
}

impl MemoryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            MemoryError::Storage(_) => "memory_storage",
            MemoryError::Serialization(_) => "memory_serialization",
            MemoryError::InvalidConfig { .. } => "memory_invalid_config",
            MemoryError::LockPoisoned => "memory_lock_poisoned",
        }
    }
}
