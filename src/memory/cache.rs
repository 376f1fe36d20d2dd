//! # Cache tier: TTL-bounded key/value store.
//!
//! Every record gets `expires_at = stored_at + ttl` on insertion. Expiry is
//! lazy — checked at read time, entries dropped as they are seen — with an
//! explicit [`CacheTier::sweep`] for periodic cleanup.
//!
//! Query relevance is the linear 24-hour decay score (see
//! [`activation`](crate::memory::activation)), computed over entries whose
//! content shares at least one token with the query.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::memory::activation::cache_score;
use crate::memory::record::MemoryRecord;
use crate::memory::similarity::similarity;

struct CacheEntry {
    record: MemoryRecord,
    expires_at: DateTime<Utc>,
}

/// TTL-bounded concurrent record cache.
pub struct CacheTier {
    entries: DashMap<Uuid, CacheEntry>,
    ttl: Duration,
}

impl CacheTier {
    /// Creates an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Stores a record under the default TTL.
    pub fn insert(&self, record: MemoryRecord) {
        self.insert_with_ttl(record, self.ttl);
    }

    /// Stores a record with an explicit TTL.
    ///
    /// TTLs beyond the representable range saturate to "never expires".
    pub fn insert_with_ttl(&self, record: MemoryRecord, ttl: Duration) {
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries
            .insert(record.id, CacheEntry { record, expires_at });
    }

    /// Fetches a record by id; expired entries are dropped and yield `None`.
    pub fn get(&self, id: Uuid) -> Option<MemoryRecord> {
        let now = Utc::now();
        let expired = match self.entries.get(&id) {
            Some(entry) if entry.expires_at > now => return Some(entry.record.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&id);
        }
        None
    }

    /// Unexpired records sharing tokens with `query`, recency-ranked.
    ///
    /// Relevance is the linear 24h decay score of each record's age; expired
    /// entries encountered along the way are removed.
    pub fn query(&self, query: &str, limit: usize) -> Vec<MemoryRecord> {
        let now = Utc::now();
        let mut expired: Vec<Uuid> = Vec::new();
        let mut results: Vec<MemoryRecord> = Vec::new();

        for entry in self.entries.iter() {
            if entry.expires_at <= now {
                expired.push(*entry.key());
                continue;
            }
            if similarity(query, &entry.record.content) > 0.0 {
                let score = cache_score(entry.record.age_seconds(now));
                results.push(entry.record.clone().scored(score));
            }
        }
        for id in expired {
            self.entries.remove(&id);
        }

        results.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        results.truncate(limit);
        results
    }

    /// Removes all expired entries; returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|entry| entry.expires_at <= now)
            .map(|entry| *entry.key())
            .collect();
        let count = expired.len();
        for id in expired {
            self.entries.remove(&id);
        }
        count
    }

    /// Number of entries, including not-yet-collected expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str) -> MemoryRecord {
        MemoryRecord::new("interaction", content)
    }

    #[tokio::test]
    async fn test_get_before_expiry() {
        let cache = CacheTier::new(Duration::from_secs(3600));
        let r = record("hello world");
        let id = r.id;
        cache.insert(r);
        assert!(cache.get(id).is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_excluded_lazily() {
        let cache = CacheTier::new(Duration::from_secs(3600));
        let r = record("hello world");
        let id = r.id;
        cache.insert_with_ttl(r, Duration::from_millis(30));

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.get(id).is_none());
        // The lazy check also removed the entry.
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_query_skips_expired() {
        let cache = CacheTier::new(Duration::from_secs(3600));
        cache.insert_with_ttl(record("hello short lived"), Duration::from_millis(30));
        cache.insert(record("hello long lived"));

        tokio::time::sleep(Duration::from_millis(60)).await;

        let results = cache.query("hello", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "hello long lived");
    }

    #[tokio::test]
    async fn test_query_filters_by_token_overlap() {
        let cache = CacheTier::new(Duration::from_secs(3600));
        cache.insert(record("hello world"));
        cache.insert(record("unrelated entry"));

        let results = cache.query("hello", 10);
        assert_eq!(results.len(), 1);
        assert!(results[0].relevance > 0.99); // fresh record, barely decayed
    }

    #[tokio::test]
    async fn test_sweep_reports_removed_count() {
        let cache = CacheTier::new(Duration::from_secs(3600));
        cache.insert_with_ttl(record("a b"), Duration::from_millis(10));
        cache.insert_with_ttl(record("c d"), Duration::from_millis(10));
        cache.insert(record("e f"));

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.sweep(), 2);
        assert_eq!(cache.len(), 1);
    }
}
