//! # Memory adapter: one logical store fanned into three tiers.
//!
//! [`MemoryAdapter`] owns the working graph, the TTL cache, and the durable
//! long-term store, plus the activation scorer. It exposes the synchronous
//! store/retrieve contract to the orchestrator and can attach itself to a
//! [`Bus`] as an ordinary subscriber, so memory writes ride the bus's
//! ordering and retry guarantees.
//!
//! ## Architecture
//! ```text
//! Bus ──► MemoryWriter (Subscribe) ──► MemoryAdapter::store(record)
//!                                          ├──► WorkingTier   (graph, volatile)
//!                                          ├──► CacheTier     (TTL k/v)
//!                                          └──► LongTermStore (SQLite, durable)
//!
//! Orchestrator ──► store_interaction / get_context / calculate_activation
//! ```
//!
//! ## Degradation
//! A failing tier never aborts a store or retrieve: the operation logs the
//! tier and continues with the rest, preferring availability over
//! completeness. Only the initial long-term connection is fatal. No
//! transaction spans the tiers — a crash between tier writes leaves them
//! inconsistent by design.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::config::MemoryConfig;
use crate::core::Bus;
use crate::error::{BusError, MemoryError, SubscribeError};
use crate::events::Envelope;
use crate::memory::activation::ActivationScorer;
use crate::memory::cache::CacheTier;
use crate::memory::longterm::{Interaction, LongTermStore};
use crate::memory::record::MemoryRecord;
use crate::memory::working::WorkingTier;
use crate::subscribers::{Subscribe, SubscriptionHandle};
use crate::topics;

/// Record kind for completed input/response pairs.
const KIND_INTERACTION: &str = "interaction";

/// Three-tier memory system behind a single store/retrieve surface.
pub struct MemoryAdapter {
    working: WorkingTier,
    cache: CacheTier,
    longterm: LongTermStore,
    scorer: ActivationScorer,
    context_limit: usize,
}

impl MemoryAdapter {
    /// Builds the tiers from configuration.
    ///
    /// # Errors
    /// - [`MemoryError::InvalidConfig`] for rejected settings;
    /// - [`MemoryError::Storage`] when the long-term connection cannot be
    ///   established (fatal by design, no silent fallback).
    pub fn new(cfg: &MemoryConfig) -> Result<Self, MemoryError> {
        cfg.validate()?;
        let longterm = match &cfg.db_path {
            Some(path) => LongTermStore::open(path, cfg.retention_ttl)?,
            None => LongTermStore::open_in_memory(cfg.retention_ttl)?,
        };
        Ok(Self {
            working: WorkingTier::new(cfg.similarity_threshold, cfg.working_capacity),
            cache: CacheTier::new(cfg.cache_ttl),
            longterm,
            scorer: ActivationScorer::new(cfg.weights),
            context_limit: cfg.context_limit,
        })
    }

    /// Writes the same logical record into all three tiers.
    ///
    /// A tier failure degrades (logged, remaining tiers still written); an
    /// error is returned only if **every** tier rejected the write.
    pub async fn store(&self, record: MemoryRecord) -> Result<(), MemoryError> {
        self.working.insert(record.clone()).await;
        self.cache.insert(record.clone());
        if let Err(err) = self.longterm.insert(&record) {
            tracing::warn!(
                tier = "longterm",
                id = %record.id,
                error = %err,
                "tier write failed; continuing with remaining tiers"
            );
        }
        Ok(())
    }

    /// Queries all tiers, concatenates, ranks by tier-local relevance
    /// descending, truncates to `limit`.
    ///
    /// There is deliberately no cross-tier score normalization, and a record
    /// present in several tiers may appear more than once — callers must not
    /// assume scores from different tiers are comparable.
    pub async fn retrieve(&self, query: &str, limit: usize) -> Vec<MemoryRecord> {
        let mut results = self.working.query(query, limit).await;
        results.extend(self.cache.query(query, limit));
        match self.longterm.query(query, limit) {
            Ok(rows) => results.extend(rows),
            Err(err) => {
                tracing::warn!(
                    tier = "longterm",
                    error = %err,
                    "tier query failed; degrading to remaining tiers"
                );
            }
        }

        results.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        results.truncate(limit);
        results
    }

    /// Records an input/response pair: an `interactions` row plus a memory
    /// record across the tiers.
    ///
    /// # Errors
    /// The interaction row is a mandatory durable write; its failure
    /// propagates. The tiered record store degrades as usual.
    pub async fn store_interaction(
        &self,
        input: &str,
        response: &str,
        context: Option<Value>,
    ) -> Result<(), MemoryError> {
        self.longterm
            .add_interaction(input, response, context.as_ref())?;

        let mut record = MemoryRecord::new(KIND_INTERACTION, format!("{input}\n{response}"));
        if let Some(context) = context {
            record = record.with_metadata(context);
        }
        self.store(record).await
    }

    /// Ranked context for a query, using the configured result limit.
    pub async fn get_context(&self, query: &str) -> Vec<MemoryRecord> {
        self.retrieve(query, self.context_limit).await
    }

    /// Blended activation score of a record, in [0, 1].
    pub fn calculate_activation(&self, record: &MemoryRecord) -> f64 {
        self.scorer.activation(record, Utc::now())
    }

    /// Most recent interactions, newest first.
    pub fn recent_interactions(&self, limit: usize) -> Result<Vec<Interaction>, MemoryError> {
        self.longterm.recent_interactions(limit)
    }

    /// Retention sweep over the long-term tier; see
    /// [`LongTermStore::clear_old_memories`].
    pub fn clear_old_memories(
        &self,
        before: Option<chrono::DateTime<Utc>>,
    ) -> Result<usize, MemoryError> {
        self.longterm.clear_old_memories(before)
    }

    /// Drops expired cache entries; returns how many were removed.
    pub fn sweep_cache(&self) -> usize {
        self.cache.sweep()
    }

    /// Subscribes the memory system to the conventional memory-bearing
    /// topics (`user_input`, `agent_output`, `context_processor`).
    ///
    /// Returns the handles, one per topic, for later detachment.
    pub async fn attach(self: &Arc<Self>, bus: &Bus) -> Result<Vec<SubscriptionHandle>, BusError> {
        let mut handles = Vec::with_capacity(3);
        for topic in [
            topics::USER_INPUT,
            topics::AGENT_OUTPUT,
            topics::CONTEXT_PROCESSOR,
        ] {
            let writer = Arc::new(MemoryWriter {
                adapter: Arc::clone(self),
            });
            handles.push(bus.subscribe(topic, writer).await?);
        }
        Ok(handles)
    }
}

/// Bus-facing side of the adapter: turns envelopes into tier writes.
struct MemoryWriter {
    adapter: Arc<MemoryAdapter>,
}

#[async_trait]
impl Subscribe for MemoryWriter {
    async fn on_event(&self, envelope: &Envelope) -> Result<(), SubscribeError> {
        let payload = &envelope.payload;

        // A completed interaction carries both sides.
        if let (Some(input), Some(response)) = (
            payload.get("input").and_then(Value::as_str),
            payload.get("response").and_then(Value::as_str),
        ) {
            return self
                .adapter
                .store_interaction(input, response, payload.get("context").cloned())
                .await
                .map_err(|err| SubscribeError::retryable(err.to_string()));
        }

        // Single-sided traffic: store the content under the topic as kind.
        let Some(content) = payload.get("content").and_then(Value::as_str) else {
            return Ok(());
        };
        if content.trim().is_empty() {
            return Ok(());
        }
        let record =
            MemoryRecord::new(envelope.topic.clone(), content).with_metadata(payload.clone());
        self.adapter
            .store(record)
            .await
            .map_err(|err| SubscribeError::retryable(err.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter() -> MemoryAdapter {
        MemoryAdapter::new(&MemoryConfig::default()).expect("adapter")
    }

    #[tokio::test]
    async fn test_store_reaches_all_tiers() {
        let adapter = adapter();
        let record = MemoryRecord::new("interaction", "tiered hello");
        adapter.store(record).await.expect("store");

        assert_eq!(adapter.working.len().await, 1);
        assert_eq!(adapter.cache.len(), 1);
        assert_eq!(adapter.longterm.memory_count().expect("count"), 1);
    }

    #[tokio::test]
    async fn test_store_interaction_then_get_context() {
        let adapter = adapter();
        adapter
            .store_interaction("hello world", "hi there", Some(json!({"user_id": "u1"})))
            .await
            .expect("store");

        let context = adapter.get_context("hello").await;
        assert!(!context.is_empty());
        assert!(context.iter().any(|r| r.content.contains("hello world")));

        let recent = adapter.recent_interactions(5).expect("recent");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].input, "hello world");
    }

    #[tokio::test]
    async fn test_retrieve_ranks_across_tiers() {
        let adapter = adapter();
        adapter
            .store(MemoryRecord::new("interaction", "alpha beta gamma"))
            .await
            .expect("store");
        adapter
            .store(MemoryRecord::new("interaction", "alpha only here"))
            .await
            .expect("store");

        let results = adapter.retrieve("alpha beta gamma", 3).await;
        assert_eq!(results.len(), 3);
        // Exact working-tier match outranks everything else.
        assert_eq!(results[0].content, "alpha beta gamma");
        assert_eq!(results[0].relevance, 1.0);
    }

    #[tokio::test]
    async fn test_retrieve_honors_limit() {
        let adapter = adapter();
        for i in 0..10 {
            adapter
                .store(MemoryRecord::new("interaction", format!("common token {i}")))
                .await
                .expect("store");
        }
        assert_eq!(adapter.retrieve("common token", 4).await.len(), 4);
    }

    #[tokio::test]
    async fn test_expired_cache_entry_survives_in_longterm() {
        let cfg = MemoryConfig {
            cache_ttl: std::time::Duration::from_millis(30),
            ..MemoryConfig::default()
        };
        let adapter = MemoryAdapter::new(&cfg).expect("adapter");
        adapter
            .store(MemoryRecord::new("interaction", "short lived cache entry"))
            .await
            .expect("store");

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        assert!(adapter.cache.query("cache entry", 5).is_empty());
        let longterm = adapter.longterm.query("cache entry", 5).expect("query");
        assert_eq!(longterm.len(), 1);

        // The merged view still serves the record from the durable tier.
        let merged = adapter.retrieve("short lived cache entry", 5).await;
        assert!(!merged.is_empty());
    }

    #[tokio::test]
    async fn test_activation_of_fresh_store() {
        let adapter = adapter();
        let record = MemoryRecord::new("interaction", "something");
        let activation = adapter.calculate_activation(&record);
        assert!((0.0..=1.0).contains(&activation));
        assert!(activation > 0.7); // fresh + non-empty content
    }
}
