//! # Event subscribers: the callback contract and per-topic registry.
//!
//! This module provides the [`Subscribe`] trait, the function-backed
//! [`SubscriberFn`] adapter, and the registry that maps topics to callbacks.
//!
//! ## Architecture
//! ```text
//! Envelope flow:
//!   publish ──► DispatchQueue ──► Dispatcher ──► registry.snapshot(topic)
//!                                                    │
//!                                      one delivery task per subscriber
//!                                                    │
//!                                  ┌─────────────────┼──────────────────┐
//!                                  ▼                 ▼                  ▼
//!                          sub1.on_event()   sub2.on_event()   subN.on_event()
//! ```
//!
//! ## Implementing custom subscribers
//! ```rust
//! use axon::{Envelope, Subscribe, SubscribeError};
//! use async_trait::async_trait;
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Subscribe for Metrics {
//!     async fn on_event(&self, envelope: &Envelope) -> Result<(), SubscribeError> {
//!         if envelope.topic == "system_error" {
//!             // increment failure counter
//!         }
//!         Ok(())
//!     }
//!     fn name(&self) -> &str { "metrics" }
//! }
//! ```

mod log;
mod registry;
mod subscribe;

pub use log::LogSubscriber;
pub use registry::SubscriptionHandle;
pub use subscribe::{Subscribe, SubscriberFn, SubscriberRef};

pub(crate) use registry::SubscriberRegistry;
