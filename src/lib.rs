//! # topiclog - Append-Only Topic Message Log
//!
//! topiclog is the persistence engine behind a publish/subscribe recorder. It
//! durably appends a time-ordered stream of topic messages (opaque payloads
//! tagged with a topic name, a message type, and a receipt time) to a SQLite
//! file, tuned for many small writes per second.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Log facade                             │
//! │                 (open, insert_message, close)                   │
//! └──────┬──────────────────────┬──────────────────────┬────────────┘
//!        │                      │                      │
//!        ▼                      ▼                      ▼
//! ┌──────────────┐   ┌─────────────────────┐   ┌──────────────────┐
//! │ Transaction  │   │   Topic resolver    │   │ Message inserter │
//! │ coordinator  │   │ (cache + idempotent │   │ (one row per     │
//! │ (time-based  │   │  type/topic rows)   │   │  message)        │
//! │  commits)    │   └─────────────────────┘   └──────────────────┘
//! └──────────────┘              │
//!        │                      ▼
//!        │            ┌─────────────────────┐
//!        └───────────►│  SQLite (rusqlite)  │◄── schema bootstrap on open
//!                     └─────────────────────┘
//! ```
//!
//! ## Core Invariants
//!
//! 1. **Single writer**: one `Log` owns its connection; one thread drives it
//! 2. **Append order**: message rows are appended in call order
//! 3. **Stable topic ids**: a (name, type) pair maps to one id for the life of the file
//! 4. **Coherent cache**: a cached topic id always exists in the database
//! 5. **Bounded loss**: at most one commit period of messages is uncommitted
//!
//! ## Module Organization
//!
//! - [`error`]: error type for every failure mode
//! - [`types`]: receipt time, topic key/id, open mode, transaction state
//! - [`config`]: commit period and schema source
//! - [`schema`]: table layout and bootstrapping
//! - [`transaction`]: time-based transaction batching
//! - [`topics`]: topic id resolution and caching
//! - [`writer`]: message row insertion
//! - [`log`]: the [`Log`] facade

// =============================================================================
// Module Declarations
// =============================================================================

/// Error types for topiclog operations.
pub mod error;

/// Value types shared across the log.
pub mod types;

/// Log configuration.
pub mod config;

/// SQLite schema definition and bootstrapping.
///
/// New files get the versioned schema applied in one transaction; existing
/// files have their recorded version checked.
pub mod schema;

/// Time-based transaction batching.
///
/// Keeps one transaction open across many inserts and commits it once the
/// commit period has elapsed, trading a bounded durability window for
/// throughput.
pub mod transaction;

/// Topic id resolution backed by a process-local cache.
pub mod topics;

/// Message row insertion.
pub mod writer;

/// The public write path.
///
/// The main entry point is [`Log`](log::Log).
pub mod log;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{LogConfig, SchemaSource, DEFAULT_COMMIT_PERIOD_MS};
pub use error::{Error, Result, TransactionAction};
pub use log::{Log, RowCounts};
pub use schema::SCHEMA_VERSION;
pub use types::{
    OpenMode, ReceiveTime, TopicId, TopicKey, TransactionState, TransactionStats,
};
