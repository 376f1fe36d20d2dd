//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogSubscriber`] emits each observed envelope as a `tracing` event.
//! Subscribe it to any topic to watch traffic during development.

use async_trait::async_trait;

use crate::error::SubscribeError;
use crate::events::{Envelope, Priority};
use crate::subscribers::subscribe::Subscribe;

/// Tracing-backed observer of bus traffic.
///
/// Urgent/high traffic is logged at `info`, everything else at `debug`.
/// Not a production sink — implement a custom [`Subscribe`] for structured
/// exports or metrics collection.
pub struct LogSubscriber;

#[async_trait]
impl Subscribe for LogSubscriber {
    async fn on_event(&self, envelope: &Envelope) -> Result<(), SubscribeError> {
        match envelope.priority {
            Priority::Urgent | Priority::High => {
                tracing::info!(
                    topic = %envelope.topic,
                    id = %envelope.id,
                    priority = envelope.priority.as_label(),
                    source = envelope.source.as_deref().unwrap_or("-"),
                    "event"
                );
            }
            _ => {
                tracing::debug!(
                    topic = %envelope.topic,
                    id = %envelope.id,
                    priority = envelope.priority.as_label(),
                    source = envelope.source.as_deref().unwrap_or("-"),
                    "event"
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
