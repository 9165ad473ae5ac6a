//! # Topic Resolution
//!
//! Maps a (topic name, message type) pair to the integer id that message
//! rows reference.
//!
//! ## Cache + Normalized Rows
//!
//! ```text
//!   resolve("/pose", "msgs.Pose")
//!        │
//!        ▼
//!   ┌──────────────┐   hit
//!   │ topic cache  │──────────► id
//!   └──────┬───────┘
//!          │ miss
//!          ▼
//!   INSERT OR IGNORE message_types       (type row exists afterwards)
//!   INSERT OR IGNORE topics ... SELECT   (type id looked up in the same statement)
//!          │
//!          ├─ row inserted ──► last_insert_rowid
//!          └─ row existed ───► SELECT id (one bounded lookup)
//! ```
//!
//! The database is the source of truth. A cache miss only means this process
//! hasn't seen the pair yet, so every miss goes through the idempotent inserts
//! above; a fresh instance on an existing file resolves to the same ids.
//!
//! The cache is process-local and only invalidated by process lifetime.
//! Another process writing to the same file is not supported.
//!
//! ## Cache Coherence Across Rollbacks
//!
//! Topic rows are inserted inside the log's open transaction. If SQLite ever
//! rolls that transaction back on its own, the ids minted in it no longer
//! exist. Keys resolved since the last commit are tracked as pending so they
//! can be dropped from the cache in that case.

use std::collections::HashMap;

use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::Result;
use crate::types::{TopicId, TopicKey};

/// Ensures the message type row exists. Duplicate names are ignored.
const INSERT_MESSAGE_TYPE: &str = "INSERT OR IGNORE INTO message_types (name) VALUES (?1)";

/// Inserts the topic row, resolving the type id in the same statement.
///
/// `?1` is the message type name, `?2` the topic name.
const INSERT_TOPIC: &str = "INSERT OR IGNORE INTO topics (name, message_type_id) \
     SELECT ?2, id FROM message_types WHERE name = ?1 LIMIT 1";

/// Reads back the id of a topic row recorded by an earlier session.
const SELECT_TOPIC: &str = "SELECT topics.id FROM topics \
     JOIN message_types ON message_types.id = topics.message_type_id \
     WHERE message_types.name = ?1 AND topics.name = ?2 LIMIT 1";

/// Topic id cache in front of the `topics` and `message_types` tables.
#[derive(Debug, Default)]
pub struct TopicResolver {
    cache: HashMap<TopicKey, TopicId>,

    /// Keys cached since the last commit.
    pending: Vec<TopicKey>,
}

impl TopicResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached topics.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Looks up a cached id without touching the database.
    pub fn cached(&self, key: &TopicKey) -> Option<TopicId> {
        self.cache.get(key).copied()
    }

    /// Resolves `(name, message_type)` to its topic id, creating the rows if
    /// needed.
    ///
    /// Must be called inside the log's active transaction, so a topic row and
    /// the messages referencing it are committed (or lost) together.
    ///
    /// # Errors
    ///
    /// `Error::Sqlite` if any statement fails to compile, bind, or execute.
    /// The cache is left untouched in that case.
    pub fn resolve(&mut self, conn: &Connection, name: &str, message_type: &str) -> Result<TopicId> {
        let key = TopicKey::new(name, message_type);
        if let Some(id) = self.cache.get(&key) {
            return Ok(*id);
        }

        let id = insert_topic(conn, &key)?;
        debug!(topic = %key.name, message_type = %key.message_type, topic_id = id.as_raw(), "resolved topic");

        self.pending.push(key.clone());
        self.cache.insert(key, id);
        Ok(id)
    }

    /// The transaction holding the pending topic rows committed.
    pub fn commit_pending(&mut self) {
        self.pending.clear();
    }

    /// The transaction holding the pending topic rows was rolled back; forget
    /// the ids minted in it.
    pub fn discard_pending(&mut self) {
        for key in self.pending.drain(..) {
            self.cache.remove(&key);
        }
    }
}

/// Runs the two dependent inserts and returns the topic's row id.
fn insert_topic(conn: &Connection, key: &TopicKey) -> Result<TopicId> {
    conn.prepare_cached(INSERT_MESSAGE_TYPE)?
        .execute(params![key.message_type])?;

    let inserted = conn
        .prepare_cached(INSERT_TOPIC)?
        .execute(params![key.message_type, key.name])?;

    // topics.id is an alias for rowid
    if inserted == 1 {
        return Ok(TopicId::from_raw(conn.last_insert_rowid()));
    }

    let id: i64 = conn
        .prepare_cached(SELECT_TOPIC)?
        .query_row(params![key.message_type, key.name], |row| row.get(0))?;
    Ok(TopicId::from_raw(id))
}

// =============================================================================
// Tests
// =============================================================================
