//! # Working tier: in-process similarity graph over the recent window.
//!
//! Records become graph nodes; an undirected edge connects two records iff
//! their content similarity exceeds the configured threshold, weighted by
//! that similarity. Insertion is O(existing nodes) — it compares the new
//! record against every node to decide edge creation — which is acceptable
//! because the tier is a bounded recent window, not the full history.
//!
//! ## Rules
//! - **Bounded**: at most `capacity` nodes; the oldest node is evicted
//!   first (insertion order is the single source of age).
//! - **Volatile**: nothing survives the process; there is no persistence.
//! - **Guarded**: structural mutation (add/evict) is serialized behind a
//!   write lock; queries take read locks.

use std::collections::{HashMap, VecDeque};

use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::memory::record::MemoryRecord;
use crate::memory::similarity::similarity;

/// Relevance multiplier for records pulled in via graph edges rather than
/// direct query similarity.
const NEIGHBOR_DISCOUNT: f64 = 0.5;

struct Graph {
    graph: StableUnGraph<MemoryRecord, f64>,
    index: HashMap<Uuid, NodeIndex>,
    /// Insertion order, oldest first; drives eviction.
    order: VecDeque<Uuid>,
}

/// Volatile similarity-graph tier.
pub struct WorkingTier {
    inner: RwLock<Graph>,
    threshold: f64,
    capacity: usize,
}

impl WorkingTier {
    /// Creates an empty tier.
    ///
    /// `threshold` is the minimum content similarity for an edge;
    /// `capacity` caps the node count (minimum 1, enforced).
    pub fn new(threshold: f64, capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Graph {
                graph: StableUnGraph::default(),
                index: HashMap::new(),
                order: VecDeque::new(),
            }),
            threshold,
            capacity: capacity.max(1),
        }
    }

    /// Inserts a record, linking it to every sufficiently similar node.
    ///
    /// Evicts oldest nodes first when the tier is at capacity.
    pub async fn insert(&self, record: MemoryRecord) {
        let mut inner = self.inner.write().await;

        while inner.order.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                if let Some(idx) = inner.index.remove(&oldest) {
                    inner.graph.remove_node(idx);
                }
            }
        }

        let id = record.id;
        let content = record.content.clone();
        let node = inner.graph.add_node(record);
        inner.index.insert(id, node);
        inner.order.push_back(id);

        let existing: Vec<NodeIndex> = inner
            .graph
            .node_indices()
            .filter(|idx| *idx != node)
            .collect();
        for other in existing {
            let Some(other_record) = inner.graph.node_weight(other) else {
                continue;
            };
            let weight = similarity(&content, &other_record.content);
            if weight > self.threshold {
                inner.graph.add_edge(node, other, weight);
            }
        }
    }

    /// Records ranked by similarity to `query`, strongest first.
    ///
    /// Direct matches score their query similarity; for matches above the
    /// edge threshold, graph neighbors join the result set at a discounted
    /// relevance (`similarity × edge weight × 0.5`) if not already present.
    pub async fn query(&self, query: &str, limit: usize) -> Vec<MemoryRecord> {
        let inner = self.inner.read().await;
        let mut scores: HashMap<NodeIndex, f64> = HashMap::new();

        for idx in inner.graph.node_indices() {
            let Some(record) = inner.graph.node_weight(idx) else {
                continue;
            };
            let score = similarity(query, &record.content);
            if score > 0.0 {
                scores.insert(idx, score);
            }
        }

        let strong: Vec<(NodeIndex, f64)> = scores
            .iter()
            .filter(|(_, s)| **s > self.threshold)
            .map(|(idx, s)| (*idx, *s))
            .collect();
        for (idx, score) in strong {
            for edge in inner.graph.edges(idx) {
                let neighbor = if edge.source() == idx {
                    edge.target()
                } else {
                    edge.source()
                };
                let discounted = score * edge.weight() * NEIGHBOR_DISCOUNT;
                let entry = scores.entry(neighbor).or_insert(0.0);
                if discounted > *entry {
                    *entry = discounted;
                }
            }
        }

        let mut results: Vec<MemoryRecord> = scores
            .into_iter()
            .filter_map(|(idx, score)| {
                inner
                    .graph
                    .node_weight(idx)
                    .map(|record| record.clone().scored(score))
            })
            .collect();
        results.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        results.truncate(limit);
        results
    }

    /// Current node count.
    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    /// True when the tier holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// True if an edge connects the two records.
    pub async fn has_edge(&self, a: Uuid, b: Uuid) -> bool {
        let inner = self.inner.read().await;
        match (inner.index.get(&a), inner.index.get(&b)) {
            (Some(ia), Some(ib)) => inner.graph.find_edge(*ia, *ib).is_some(),
            _ => false,
        }
    }

    /// Total number of similarity edges.
    pub async fn edge_count(&self) -> usize {
        self.inner.read().await.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str) -> MemoryRecord {
        MemoryRecord::new("interaction", content)
    }

    #[tokio::test]
    async fn test_edge_created_above_threshold() {
        let tier = WorkingTier::new(0.3, 64);
        let a = record("the quick brown fox");
        let b = record("the quick brown dog");
        let (ia, ib) = (a.id, b.id);

        tier.insert(a).await;
        tier.insert(b).await;

        // {the, quick, brown} shared of 5 total = 0.6 > 0.3
        assert!(tier.has_edge(ia, ib).await);
    }

    #[tokio::test]
    async fn test_no_edge_at_quarter_similarity() {
        let tier = WorkingTier::new(0.3, 64);
        let a = record("foo bar baz");
        let b = record("foo qux");
        let (ia, ib) = (a.id, b.id);

        tier.insert(a).await;
        tier.insert(b).await;

        // Jaccard = 0.25, below the 0.3 threshold.
        assert!(!tier.has_edge(ia, ib).await);
        assert_eq!(tier.edge_count().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_first() {
        let tier = WorkingTier::new(0.3, 3);
        for i in 0..5 {
            tier.insert(record(&format!("unique content number {i}")))
                .await;
        }

        assert_eq!(tier.len().await, 3);
        let survivors = tier.query("unique content number", 10).await;
        let contents: Vec<&str> = survivors.iter().map(|r| r.content.as_str()).collect();
        assert!(!contents.contains(&"unique content number 0"));
        assert!(!contents.contains(&"unique content number 1"));
        assert!(contents.contains(&"unique content number 4"));
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let tier = WorkingTier::new(0.3, 64);
        tier.insert(record("rust event bus")).await;
        tier.insert(record("rust memory tiers")).await;
        tier.insert(record("completely unrelated text")).await;

        let results = tier.query("rust event bus", 10).await;
        assert_eq!(results[0].content, "rust event bus");
        assert_eq!(results[0].relevance, 1.0);
        assert!(results.iter().all(|r| r.content != "completely unrelated text"));
    }

    #[tokio::test]
    async fn test_query_limit() {
        let tier = WorkingTier::new(0.3, 64);
        for i in 0..10 {
            tier.insert(record(&format!("shared words plus {i}"))).await;
        }
        assert_eq!(tier.query("shared words", 4).await.len(), 4);
    }
}
