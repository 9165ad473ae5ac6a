//! # Log Facade
//!
//! [`Log`] is the public write path: open (or create) a store, then call
//! [`Log::insert_message`] for every recorded message.
//!
//! ## Insert Pipeline
//!
//! ```text
//! insert_message(time, topic, type, payload)
//!   1. transaction.ensure_active()       BEGIN if idle
//!   2. topics.resolve(topic, type)       cache, else idempotent inserts
//!   3. writer::insert_message(...)       one row in `messages`
//!   4. transaction.maybe_commit()        COMMIT once the period has passed
//! ```
//!
//! ## Partial Failures
//!
//! When step 2 or 3 fails, the message is skipped and the error returned.
//! Nothing is rolled back: messages inserted earlier in the same open
//! transaction stay pending and a later insert's step 4 (or `flush`, `close`,
//! drop) commits them. Changing this to roll back would throw away messages
//! that were already accepted.
//!
//! ## Ownership
//!
//! A `Log` exclusively owns its connection. It can be moved between threads
//! but is not `Sync`: one thread drives it at a time, and nothing is
//! synchronized internally. Two `Log`s writing the same file are not
//! supported.
//!
//! Dropping an open `Log` commits any active transaction (best effort; a
//! failure is logged, not raised) and then closes the connection. Use
//! [`Log::close`] to observe that final commit's result.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::LogConfig;
use crate::error::{Error, Result};
use crate::schema;
use crate::topics::TopicResolver;
use crate::transaction::TransactionCoordinator;
use crate::types::{OpenMode, ReceiveTime, TransactionState, TransactionStats};
use crate::writer;

// =============================================================================
// Row Counts
// =============================================================================

/// Row counts of the log tables, as seen by the log's own connection
/// (uncommitted rows included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    pub message_types: u64,
    pub topics: u64,
    pub messages: u64,
}

// =============================================================================
// Log
// =============================================================================

/// An append-only, SQLite-backed log of topic messages.
///
/// # Example
///
/// ```rust,no_run
/// use topiclog::{Log, OpenMode, ReceiveTime};
///
/// let mut log = Log::new();
/// log.open("recording.tlog", OpenMode::ReadWriteCreate)?;
/// log.insert_message(ReceiveTime::now(), "/chatter", "msgs.StringMsg", b"hello")?;
/// log.close()?;
/// # Ok::<(), topiclog::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Log {
    config: LogConfig,
    inner: Option<OpenLog>,
}

impl Log {
    /// Creates a closed log with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a closed log with `config`.
    pub fn with_config(config: LogConfig) -> Self {
        Self {
            config,
            inner: None,
        }
    }

    /// Creates a log with the default configuration and opens `path`.
    pub fn open_new(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let mut log = Self::new();
        log.open(path, mode)?;
        Ok(log)
    }

    /// Opens the store at `path`, applying the schema if the file is new.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyOpen` if this instance already has a store open (the
    ///   open store is left as it was)
    /// - `Error::Connection` if the file can't be opened in `mode`, or isn't a
    ///   SQLite database
    /// - `Error::Schema`, `Error::SchemaRead`, `Error::SchemaApply` if the
    ///   schema can't be verified or applied
    pub fn open(&mut self, path: impl AsRef<Path>, mode: OpenMode) -> Result<()> {
        if let Some(open) = &self.inner {
            warn!(path = %open.path.display(), "a log is already open");
            return Err(Error::AlreadyOpen {
                path: open.path.clone(),
            });
        }

        let path = path.as_ref().to_path_buf();
        let connection_err = |source| Error::Connection {
            path: path.clone(),
            source,
        };

        let mut conn = Connection::open_with_flags(&path, mode.flags()).map_err(connection_err)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")
            .map_err(connection_err)?;

        match schema::bootstrap(&mut conn, mode, &self.config.schema) {
            Ok(()) => {}
            // The first read of the file fails when it isn't a database at all.
            Err(Error::Sqlite(source)) => return Err(connection_err(source)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to initialize log");
                return Err(e);
            }
        }

        info!(path = %path.display(), %mode, "opened log");
        self.inner = Some(OpenLog {
            conn,
            path,
            mode,
            transaction: TransactionCoordinator::new(self.config.commit_period),
            topics: TopicResolver::new(),
        });
        Ok(())
    }

    /// Appends one message to the log.
    ///
    /// # Errors
    ///
    /// - `Error::NotOpen` before `open`
    /// - `Error::Transaction` if a transaction can't be started, or if the
    ///   periodic commit failed and SQLite discarded the pending messages
    /// - `Error::Sqlite` if resolving the topic or inserting the row fails;
    ///   the store stays open and earlier pending messages are kept
    pub fn insert_message(
        &mut self,
        time: ReceiveTime,
        topic: &str,
        message_type: &str,
        payload: &[u8],
    ) -> Result<()> {
        self.open_log_mut()?
            .insert_message(time, topic, message_type, payload)
    }

    /// Commits the active transaction now, if there is one.
    ///
    /// Returns whether a commit happened.
    pub fn flush(&mut self) -> Result<bool> {
        self.open_log_mut()?.commit()
    }

    /// Commits any active transaction and closes the store.
    ///
    /// The instance is closed afterwards even if the commit failed, and can be
    /// opened again.
    pub fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(open) => open.close(),
            None => Err(Error::NotOpen),
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Path of the open store.
    pub fn path(&self) -> Option<&Path> {
        self.inner.as_ref().map(|open| open.path.as_path())
    }

    /// Mode the open store was opened with.
    pub fn mode(&self) -> Option<OpenMode> {
        self.inner.as_ref().map(|open| open.mode)
    }

    /// `Idle` when no store is open.
    pub fn transaction_state(&self) -> TransactionState {
        self.inner
            .as_ref()
            .map_or(TransactionState::Idle, |open| open.transaction.state())
    }

    /// Successful begins and commits since the store was opened.
    pub fn transaction_stats(&self) -> TransactionStats {
        self.inner
            .as_ref()
            .map(|open| open.transaction.stats())
            .unwrap_or_default()
    }

    pub fn commit_period(&self) -> Duration {
        self.config.commit_period
    }

    /// Changes the commit period, for this instance and any store it opens.
    pub fn set_commit_period(&mut self, period: Duration) {
        self.config.commit_period = period;
        if let Some(open) = self.inner.as_mut() {
            open.transaction.set_commit_period(period);
        }
    }

    /// Number of (topic, type) pairs in the topic cache.
    pub fn cached_topics(&self) -> usize {
        self.inner.as_ref().map_or(0, |open| open.topics.len())
    }

    /// Schema version recorded in the open store.
    pub fn schema_version(&self) -> Result<Option<String>> {
        schema::recorded_version(&self.open_log()?.conn)
    }

    /// Counts rows in the log tables, including uncommitted ones.
    pub fn row_counts(&self) -> Result<RowCounts> {
        let conn = &self.open_log()?.conn;
        let count = |table: &str| -> Result<u64> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
            Ok(n as u64)
        };

        Ok(RowCounts {
            message_types: count("message_types")?,
            topics: count("topics")?,
            messages: count("messages")?,
        })
    }

    fn open_log(&self) -> Result<&OpenLog> {
        self.inner.as_ref().ok_or(Error::NotOpen)
    }

    fn open_log_mut(&mut self) -> Result<&mut OpenLog> {
        self.inner.as_mut().ok_or(Error::NotOpen)
    }
}

impl Drop for Log {
    fn drop(&mut self) {
        if let Some(open) = self.inner.take() {
            let path = open.path.clone();
            if let Err(e) = open.close() {
                warn!(path = %path.display(), error = %e, "final commit failed while dropping log");
            }
        }
    }
}

// =============================================================================
// Open Store
// =============================================================================

/// Everything that only exists while a store is open.
#[derive(Debug)]
struct OpenLog {
    conn: Connection,
    path: PathBuf,
    mode: OpenMode,
    transaction: TransactionCoordinator,
    topics: TopicResolver,
}

impl OpenLog {
    fn insert_message(
        &mut self,
        time: ReceiveTime,
        topic: &str,
        message_type: &str,
        payload: &[u8],
    ) -> Result<()> {
        // Many messages per transaction, for throughput.
        if let Err(e) = self.transaction.ensure_active(&self.conn) {
            warn!(error = %e, "failed to begin transaction");
            self.after_failure();
            return Err(e);
        }

        let topic_id = match self.topics.resolve(&self.conn, topic, message_type) {
            Ok(id) => id,
            Err(e) => {
                warn!(topic, message_type, error = %e, "failed to resolve topic");
                self.after_failure();
                return Err(e);
            }
        };

        if let Err(e) = writer::insert_message(&self.conn, time, topic_id, payload) {
            warn!(topic, message_type, error = %e, "failed to insert message");
            self.after_failure();
            return Err(e);
        }

        match self.transaction.maybe_commit(&self.conn) {
            Ok(committed) => {
                if committed {
                    self.topics.commit_pending();
                }
                Ok(())
            }
            // Still open: this message and the rest are flushed by a later commit.
            Err(e) if self.transaction.is_active() => {
                warn!(error = %e, "periodic commit failed, transaction left open");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "periodic commit failed and sqlite discarded the transaction");
                self.topics.discard_pending();
                Err(e)
            }
        }
    }

    fn commit(&mut self) -> Result<bool> {
        match self.transaction.commit(&self.conn) {
            Ok(committed) => {
                if committed {
                    self.topics.commit_pending();
                }
                Ok(committed)
            }
            Err(e) => {
                if !self.transaction.is_active() {
                    self.topics.discard_pending();
                }
                Err(e)
            }
        }
    }

    /// Brings the coordinator and topic cache back in line with SQLite after a
    /// failed statement. Never rolls anything back itself.
    fn after_failure(&mut self) {
        if self.transaction.reconcile(&self.conn) && !self.transaction.is_active() {
            self.topics.discard_pending();
        }
    }

    fn close(mut self) -> Result<()> {
        let committed = self.commit();

        let path = self.path;
        let closed = self.conn.close().map_err(|(_, source)| Error::Connection {
            path: path.clone(),
            source,
        });
        info!(path = %path.display(), "closed log");

        committed.and(closed)
    }
}

// =============================================================================
// Tests
// =============================================================================
