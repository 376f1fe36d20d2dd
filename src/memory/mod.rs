//! # Three-tier memory: working graph, TTL cache, durable long-term store.
//!
//! Every stored record is written to all three tiers; retrieval queries
//! them independently and merges by tier-local relevance. The tiers differ
//! in durability and decay:
//!
//! | Tier      | Backing                   | Lifetime                     |
//! |-----------|---------------------------|------------------------------|
//! | Working   | in-process similarity graph | process (bounded window)   |
//! | Cache     | concurrent TTL map        | TTL expiry / sweep           |
//! | Long-term | SQLite, append-only       | retention sweep only         |
//!
//! [`MemoryAdapter`] is the façade the orchestrator talks to; it also
//! subscribes the tiers to the bus so memory writes inherit the bus's
//! ordering and retry guarantees.

mod activation;
mod adapter;
mod cache;
mod longterm;
mod record;
mod similarity;
mod working;

pub use activation::{ActivationScorer, ActivationWeights};
pub use adapter::MemoryAdapter;
pub use cache::CacheTier;
pub use longterm::{Interaction, LongTermStore};
pub use record::MemoryRecord;
pub use similarity::{similarity, tokenize};
pub use working::WorkingTier;
