//! # Long-term tier: durable append-only SQLite store.
//!
//! The schema is the reference shape, kept bit-exact for compatibility with
//! existing stores:
//!
//! ```sql
//! memories(id TEXT PRIMARY KEY, type TEXT, content TEXT,
//!          timestamp REAL, relevance REAL DEFAULT 0, metadata TEXT)
//! interactions(id INTEGER PRIMARY KEY AUTOINCREMENT, input TEXT,
//!              response TEXT, timestamp REAL, context TEXT)
//! ```
//!
//! ## Rules
//! - **Append-only**: no in-place updates; rows leave only through the
//!   retention sweep ([`LongTermStore::clear_old_memories`]).
//! - **Fatal open**: failure to establish the connection propagates to the
//!   caller — writes would otherwise be silently lost.
//! - Timestamps persist as REAL epoch seconds; `metadata`/`context` hold
//!   serialized JSON text.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{Connection, params, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::MemoryError;
use crate::memory::activation::longterm_score;
use crate::memory::record::MemoryRecord;
use crate::memory::similarity::tokenize;

/// Upper bound on the number of query tokens turned into SQL match clauses.
const MAX_QUERY_TOKENS: usize = 8;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp REAL NOT NULL,
    relevance REAL DEFAULT 0,
    metadata TEXT
);
CREATE TABLE IF NOT EXISTS interactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    input TEXT NOT NULL,
    response TEXT NOT NULL,
    timestamp REAL NOT NULL,
    context TEXT
);
";

/// One row of the `interactions` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Autoincremented row id.
    pub id: i64,
    /// User input text.
    pub input: String,
    /// Agent response text.
    pub response: String,
    /// When the interaction was recorded.
    pub timestamp: DateTime<Utc>,
    /// Opaque structured context; persisted as JSON text.
    pub context: Option<Value>,
}

/// Durable append-only store for memories and interactions.
pub struct LongTermStore {
    conn: Mutex<Connection>,
    retention: Duration,
}

impl LongTermStore {
    /// Opens (or creates) the store at `path`.
    ///
    /// # Errors
    /// Propagates any SQLite failure; there is no silent fallback.
    pub fn open(path: impl AsRef<Path>, retention: Duration) -> Result<Self, MemoryError> {
        let conn = Connection::open(path)?;
        Self::initialize(conn, retention)
    }

    /// Opens a private in-memory store (tests, ephemeral deployments).
    pub fn open_in_memory(retention: Duration) -> Result<Self, MemoryError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, retention)
    }

    fn initialize(conn: Connection, retention: Duration) -> Result<Self, MemoryError> {
        // WAL keeps concurrent readers cheap; harmless for :memory:.
        let _ = conn.pragma_update(None, "journal_mode", "wal");
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            retention,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, MemoryError> {
        self.conn.lock().map_err(|_| MemoryError::LockPoisoned)
    }

    /// Appends a memory row. `relevance` is left at its column default —
    /// it is recomputed at query time, never persisted as ground truth.
    pub fn insert(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let metadata = record
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn()?.execute(
            "INSERT INTO memories (id, type, content, timestamp, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.to_string(),
                record.kind,
                record.content,
                to_epoch(record.timestamp),
                metadata,
            ],
        )?;
        Ok(())
    }

    /// Memories whose content shares a token with `query`, newest first.
    ///
    /// Relevance is the long-term step score (0.9 under 24h, 0.3 after).
    /// At most [`MAX_QUERY_TOKENS`] tokens become match clauses; a
    /// token-free query falls back to plain recency.
    pub fn query(&self, query: &str, limit: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut tokens: Vec<String> = tokenize(query).into_iter().collect();
        tokens.truncate(MAX_QUERY_TOKENS);

        let sql = if tokens.is_empty() {
            format!(
                "SELECT id, type, content, timestamp, metadata FROM memories
                 ORDER BY timestamp DESC LIMIT {}",
                limit as i64
            )
        } else {
            let clauses: Vec<String> = (1..=tokens.len())
                .map(|n| format!("instr(lower(content), ?{n}) > 0"))
                .collect();
            format!(
                "SELECT id, type, content, timestamp, metadata FROM memories
                 WHERE {} ORDER BY timestamp DESC LIMIT {}",
                clauses.join(" OR "),
                limit as i64
            )
        };

        let now = Utc::now();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(tokens), |row| {
            let id_text: String = row.get(0)?;
            let id = Uuid::parse_str(&id_text).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            let metadata: Option<String> = row.get(4)?;
            let metadata = metadata
                .map(|text| {
                    serde_json::from_str(&text).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            4,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })
                })
                .transpose()?;

            Ok(MemoryRecord {
                id,
                kind: row.get(1)?,
                content: row.get(2)?,
                timestamp: from_epoch(row.get(3)?),
                relevance: 0.0,
                metadata,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            let record = row?;
            let score = longterm_score(record.age_seconds(now));
            results.push(record.scored(score));
        }
        Ok(results)
    }

    /// Appends an interaction row; returns its row id.
    pub fn add_interaction(
        &self,
        input: &str,
        response: &str,
        context: Option<&Value>,
    ) -> Result<i64, MemoryError> {
        let context = context.map(serde_json::to_string).transpose()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO interactions (input, response, timestamp, context)
             VALUES (?1, ?2, ?3, ?4)",
            params![input, response, to_epoch(Utc::now()), context],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent interactions, newest first.
    pub fn recent_interactions(&self, limit: usize) -> Result<Vec<Interaction>, MemoryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, input, response, timestamp, context FROM interactions
             ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let context: Option<String> = row.get(4)?;
            let context = context
                .map(|text| {
                    serde_json::from_str(&text).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            4,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })
                })
                .transpose()?;
            Ok(Interaction {
                id: row.get(0)?,
                input: row.get(1)?,
                response: row.get(2)?,
                timestamp: from_epoch(row.get(3)?),
                context,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(MemoryError::from)
    }

    /// Deletes memories with `timestamp < before`; returns removed count.
    ///
    /// Without an explicit cutoff, everything older than the configured
    /// retention TTL is removed.
    pub fn clear_old_memories(
        &self,
        before: Option<DateTime<Utc>>,
    ) -> Result<usize, MemoryError> {
        let cutoff = before.unwrap_or_else(|| {
            let retention = TimeDelta::from_std(self.retention).unwrap_or(TimeDelta::MAX);
            Utc::now()
                .checked_sub_signed(retention)
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        });
        let removed = self.conn()?.execute(
            "DELETE FROM memories WHERE timestamp < ?1",
            params![to_epoch(cutoff)],
        )?;
        Ok(removed)
    }

    /// Number of memory rows (tests, introspection).
    pub fn memory_count(&self) -> Result<usize, MemoryError> {
        let count: i64 =
            self.conn()?
                .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// REAL epoch seconds for the reference schema.
fn to_epoch(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_micros() as f64 / 1e6
}

/// Rehydrates a REAL column; malformed values clamp to the epoch.
fn from_epoch(seconds: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros((seconds * 1e6) as i64).unwrap_or_default()
}
